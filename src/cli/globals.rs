use crate::protocol::HandoverEndpoints;
use url::Url;

/// Configuration shared by every action.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub public_url: Url,
    pub endpoints: HandoverEndpoints,
    pub apps: Vec<String>,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(public_url: Url, cookie_handover_url: Url, token_handover_url: Url) -> Self {
        Self {
            public_url,
            endpoints: HandoverEndpoints {
                cookie_handover_url,
                token_handover_url,
            },
            apps: Vec::new(),
        }
    }

    pub fn set_apps(&mut self, apps: Vec<String>) {
        self.apps = apps;
    }
}
