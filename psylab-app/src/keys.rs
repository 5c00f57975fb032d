use psylab_core::{KeyInput, KeyPress, PsylabError, Result};
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;
use winit::keyboard::KeyCode;

const LETTERS: [KeyCode; 26] = [
    KeyCode::KeyA,
    KeyCode::KeyB,
    KeyCode::KeyC,
    KeyCode::KeyD,
    KeyCode::KeyE,
    KeyCode::KeyF,
    KeyCode::KeyG,
    KeyCode::KeyH,
    KeyCode::KeyI,
    KeyCode::KeyJ,
    KeyCode::KeyK,
    KeyCode::KeyL,
    KeyCode::KeyM,
    KeyCode::KeyN,
    KeyCode::KeyO,
    KeyCode::KeyP,
    KeyCode::KeyQ,
    KeyCode::KeyR,
    KeyCode::KeyS,
    KeyCode::KeyT,
    KeyCode::KeyU,
    KeyCode::KeyV,
    KeyCode::KeyW,
    KeyCode::KeyX,
    KeyCode::KeyY,
    KeyCode::KeyZ,
];

const DIGITS: [KeyCode; 10] = [
    KeyCode::Digit0,
    KeyCode::Digit1,
    KeyCode::Digit2,
    KeyCode::Digit3,
    KeyCode::Digit4,
    KeyCode::Digit5,
    KeyCode::Digit6,
    KeyCode::Digit7,
    KeyCode::Digit8,
    KeyCode::Digit9,
];

/// Maps a key name as written in the configuration to a physical key.
///
/// Escape is reserved for aborting the run and cannot be registered.
pub fn key_code(name: &str) -> Option<KeyCode> {
    let name = name.trim().to_ascii_lowercase();
    let code = match name.as_str() {
        "space" => KeyCode::Space,
        "return" | "enter" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "left" => KeyCode::ArrowLeft,
        "right" => KeyCode::ArrowRight,
        "up" => KeyCode::ArrowUp,
        "down" => KeyCode::ArrowDown,
        "lshift" => KeyCode::ShiftLeft,
        "rshift" => KeyCode::ShiftRight,
        _ => {
            let mut chars = name.chars();
            let (Some(c), None) = (chars.next(), chars.next()) else {
                return None;
            };
            match c {
                'a'..='z' => LETTERS[(c as u8 - b'a') as usize],
                '0'..='9' => DIGITS[(c as u8 - b'0') as usize],
                _ => return None,
            }
        }
    };
    Some(code)
}

struct Route {
    name: String,
    sender: Sender<KeyPress>,
}

/// Routes physical key-downs from the window to registered channels.
///
/// Clones share the routing table: the window side calls
/// [`KeyRouter::dispatch`], the run registers keys through [`KeyInput`].
#[derive(Clone, Default)]
pub struct KeyRouter {
    routes: Arc<Mutex<HashMap<KeyCode, Route>>>,
}

impl KeyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forwards a key-down taken at timer reading `at`. Returns whether a
    /// registered key consumed it.
    pub fn dispatch(&self, code: KeyCode, at: Duration) -> bool {
        let Ok(routes) = self.routes.lock() else {
            return false;
        };
        let Some(route) = routes.get(&code) else {
            return false;
        };
        debug!(key = %route.name, at = ?at, "key down");
        // a dropped receiver just means nobody is listening any more
        route
            .sender
            .send(KeyPress {
                key: route.name.clone(),
                at,
            })
            .is_ok()
    }

    fn routes(&self) -> Result<std::sync::MutexGuard<'_, HashMap<KeyCode, Route>>> {
        self.routes
            .lock()
            .map_err(|_| PsylabError::Input("key routing table poisoned".to_string()))
    }
}

fn known_key(key: &str) -> Result<KeyCode> {
    key_code(key).ok_or_else(|| PsylabError::config(format!("unknown key name {key:?}")))
}

impl KeyInput for KeyRouter {
    fn on_key(&mut self, key: &str) -> Result<Receiver<KeyPress>> {
        let code = known_key(key)?;
        let (sender, receiver) = mpsc::channel();
        let replaced = self.routes()?.insert(
            code,
            Route {
                name: key.to_string(),
                sender,
            },
        );
        if replaced.is_some() {
            debug!(key, "key registration replaced");
        }
        Ok(receiver)
    }

    fn remove_key(&mut self, key: &str) -> Result<()> {
        let code = known_key(key)?;
        self.routes()?.remove(&code);
        Ok(())
    }
}
