use anyhow::{Result, bail};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Chatbot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Redirect(Route),
    Render(Screen),
}

impl Route {
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };

        match normalized {
            "/" | "" => Ok(Route::Root),
            "/chatbot" => Ok(Route::Chatbot),
            _ => bail!("No screen at route {:?}", path),
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Root => "/",
            Route::Chatbot => "/chatbot",
        }
    }

    pub fn resolve(self) -> Resolution {
        match self {
            Route::Root => Resolution::Redirect(Route::Chatbot),
            Route::Chatbot => Resolution::Render(Screen::Chat),
        }
    }
}

/// Follow redirects from `path` to the screen it lands on.
pub fn navigate(path: &str) -> Result<Screen> {
    let mut route = Route::parse(path)?;
    // Every redirect moves to a route that renders, so two hops is enough.
    for _ in 0..2 {
        match route.resolve() {
            Resolution::Render(screen) => return Ok(screen),
            Resolution::Redirect(next) => {
                tracing::debug!(from = route.path(), to = next.path(), "redirect");
                route = next;
            }
        }
    }
    bail!("Redirect loop at route {:?}", path)
}
