use anyhow::{Context, Result};
use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::*;
use x11rb::rust_connection::RustConnection;

use crate::constants::x11::TITLE_MAX_LEN;
use crate::pointer::{PointerSource, WindowFrame};

/// Pre-cached X11 atoms to avoid repeated roundtrips
pub struct CachedAtoms {
    pub wm_name: Atom,
    pub net_wm_name: Atom,
    pub utf8_string: Atom,
    pub net_client_list: Atom,
}

impl CachedAtoms {
    pub fn new(conn: &RustConnection) -> Result<Self> {
        // Do all intern_atom roundtrips once at startup
        Ok(Self {
            wm_name: intern(conn, b"WM_NAME")?,
            net_wm_name: intern(conn, b"_NET_WM_NAME")?,
            utf8_string: intern(conn, b"UTF8_STRING")?,
            net_client_list: intern(conn, b"_NET_CLIENT_LIST")?,
        })
    }
}

fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom> {
    let label = String::from_utf8_lossy(name);
    Ok(conn
        .intern_atom(false, name)
        .with_context(|| format!("Failed to intern {} atom", label))?
        .reply()
        .with_context(|| format!("Failed to get reply for {} atom", label))?
        .atom)
}

/// X11 connection plus the bits every widget lookup needs
pub struct X11Session {
    pub conn: RustConnection,
    pub root: Window,
    pub atoms: CachedAtoms,
}

impl X11Session {
    pub fn connect() -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(None)
            .context("Failed to connect to X11 server. Is DISPLAY set correctly?")?;
        let root = conn.setup().roots[screen_num].root;
        let atoms = CachedAtoms::new(&conn).context("Failed to cache X11 atoms at startup")?;
        Ok(Self { conn, root, atoms })
    }

    /// Window title, preferring the UTF-8 EWMH name over legacy WM_NAME
    pub fn window_title(&self, window: Window) -> Result<String> {
        let net_name = self
            .conn
            .get_property(false, window, self.atoms.net_wm_name, self.atoms.utf8_string, 0, TITLE_MAX_LEN)
            .context(format!("Failed to query _NET_WM_NAME for window {}", window))?
            .reply()
            .context(format!("Failed to get _NET_WM_NAME reply for window {}", window))?;
        if !net_name.value.is_empty() {
            return Ok(String::from_utf8_lossy(&net_name.value).into_owned());
        }

        let name = self
            .conn
            .get_property(false, window, self.atoms.wm_name, AtomEnum::STRING, 0, TITLE_MAX_LEN)
            .context(format!("Failed to query WM_NAME for window {}", window))?
            .reply()
            .context(format!("Failed to get WM_NAME reply for window {}", window))?;
        Ok(String::from_utf8_lossy(&name.value).into_owned())
    }

    /// Find a managed window by exact title
    pub fn find_window_by_title(&self, title: &str) -> Result<Option<Window>> {
        let prop = self
            .conn
            .get_property(false, self.root, self.atoms.net_client_list, AtomEnum::WINDOW, 0, u32::MAX)
            .context("Failed to query _NET_CLIENT_LIST property")?
            .reply()
            .context("Failed to get window list from X11 server")?;
        let windows: Vec<Window> = prop
            .value32()
            .ok_or_else(|| anyhow::anyhow!("Invalid return from _NET_CLIENT_LIST"))?
            .collect();

        for window in windows {
            // Windows can vanish between listing and querying
            match self.window_title(window) {
                Ok(name) if name == title => return Ok(Some(window)),
                Ok(_) => {}
                Err(e) => debug!(window = window, error = ?e, "Skipping window"),
            }
        }
        Ok(None)
    }

    /// Frame of a viewable window in root coordinates
    pub fn viewable_frame(&self, window: Window) -> Result<Option<WindowFrame>> {
        let attrs = self
            .conn
            .get_window_attributes(window)
            .context(format!("Failed to query attributes for window {}", window))?
            .reply()
            .context(format!("Failed to get attributes reply for window {}", window))?;
        if attrs.map_state != MapState::VIEWABLE {
            return Ok(None);
        }

        let geom = self
            .conn
            .get_geometry(window)
            .context(format!("Failed to query geometry for window {}", window))?
            .reply()
            .context(format!("Failed to get geometry reply for window {}", window))?;
        let origin = self
            .conn
            .translate_coordinates(window, self.root, 0, 0)
            .context(format!("Failed to translate coordinates for window {}", window))?
            .reply()
            .context(format!("Failed to get translate reply for window {}", window))?;

        Ok(Some(WindowFrame {
            x: origin.dst_x as f64,
            y: origin.dst_y as f64,
            width: geom.width as f64,
            height: geom.height as f64,
        }))
    }
}

/// Pointer source backed by an X11 session
/// The widget window is looked up by title and re-resolved whenever it disappears
pub struct X11PointerSource {
    session: X11Session,
    title: String,
    window: Option<Window>,
}

impl X11PointerSource {
    pub fn connect(title: &str) -> Result<Self> {
        Ok(Self {
            session: X11Session::connect()?,
            title: title.to_string(),
            window: None,
        })
    }
}

impl PointerSource for X11PointerSource {
    fn pointer_position(&mut self) -> Result<(f64, f64)> {
        let reply = self
            .session
            .conn
            .query_pointer(self.session.root)
            .context("Failed to query pointer")?
            .reply()
            .context("Failed to get pointer reply")?;
        Ok((reply.root_x as f64, reply.root_y as f64))
    }

    fn widget_frame(&mut self) -> Result<Option<WindowFrame>> {
        let window = match self.window {
            Some(window) => window,
            None => match self.session.find_window_by_title(&self.title)? {
                Some(window) => {
                    debug!(window = window, title = %self.title, "Found widget window");
                    self.window = Some(window);
                    window
                }
                None => return Ok(None),
            },
        };

        match self.session.viewable_frame(window) {
            Ok(frame) => Ok(frame),
            Err(e) => {
                // Destroyed: forget it and look it up again next tick
                self.window = None;
                Err(e)
            }
        }
    }
}
