//! Driving the handover from a page: reading the location and navigating.

use tracing::{debug, instrument};
use url::Url;

use super::{
    create_outbound_url, get_param, next_hop, set_params, strip_params, AuthStore, Error,
    HandoverEndpoints, Stage, Transition, STAGE_PARAM,
};

/// The slice of a browser window the handover needs.
pub trait Window {
    fn location(&self) -> Url;

    /// Full navigation that replaces the current history entry.
    fn replace(&mut self, url: &Url);

    /// Rewrite the current history entry without navigating.
    fn replace_state(&mut self, url: &Url);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    Replace(Url),
    ReplaceState(Url),
}

/// A window that remembers the last navigation instead of performing it.
#[derive(Debug, Clone)]
pub struct RecordingWindow {
    location: Url,
    navigations: Vec<Navigation>,
}

impl RecordingWindow {
    #[must_use]
    pub fn new(location: Url) -> Self {
        Self {
            location,
            navigations: Vec::new(),
        }
    }

    #[must_use]
    pub fn navigations(&self) -> &[Navigation] {
        &self.navigations
    }

    #[must_use]
    pub fn last_navigation(&self) -> Option<&Navigation> {
        self.navigations.last()
    }
}

impl Window for RecordingWindow {
    fn location(&self) -> Url {
        self.location.clone()
    }

    fn replace(&mut self, url: &Url) {
        self.location = url.clone();
        self.navigations.push(Navigation::Replace(url.clone()));
    }

    fn replace_state(&mut self, url: &Url) {
        self.location = url.clone();
        self.navigations.push(Navigation::ReplaceState(url.clone()));
    }
}

/// Run the state machine for the page the window is on and navigate to
/// wherever it leads.
///
/// # Errors
/// Returns the state machine error without navigating.
pub fn handle_os_redirect<W: Window + ?Sized>(
    window: &mut W,
    endpoints: &HandoverEndpoints,
    store: &AuthStore,
) -> Result<Transition, Error> {
    let transition = next_hop(&window.location(), endpoints, store)?;
    window.replace(transition.url());
    Ok(transition)
}

/// Force a fresh handover that comes back to the current page.
///
/// Returns `true` while the round trip is in flight (a navigation was
/// issued) and `false` once the page is back with its stage cleaned off.
#[instrument(skip_all, fields(handover = %handover_url))]
pub fn handle_forced_redirect<W: Window + ?Sized>(window: &mut W, handover_url: &Url) -> bool {
    let mut location = window.location();

    if get_param(&location, STAGE_PARAM).as_deref() == Some(Stage::ForcedAuthReturn.as_str()) {
        strip_params(&mut location, &[STAGE_PARAM]);
        window.replace_state(&location);

        debug!("forced handover complete");

        return false;
    }

    set_params(&mut location, &[(STAGE_PARAM, Stage::ForcedAuthReturn.as_str())]);
    let outbound = create_outbound_url(handover_url, location.as_str());
    window.replace(&outbound);

    debug!("forced handover started");

    true
}
