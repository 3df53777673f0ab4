//! The handover state machine.
//!
//! Each landing hop decodes its [`Landing`] state from the query string and
//! produces a [`Transition`]: either the next hop to navigate to, or the
//! target the user originally asked for. The protocol state never leaves the
//! URL, so every hop is a pure function of its URL and the local store.

use secrecy::SecretString;
use tracing::{debug, info, instrument};
use url::Url;

use super::{
    create_url_with_params, get_param, set_params, strip_params, AuthStore, Error, Stage,
    COOKIES_PARAM, RETURN_PARAM, STAGE_PARAM, TOKEN_PARAM,
};

/// Where the two collaborator endpoints live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoverEndpoints {
    pub cookie_handover_url: Url,
    pub token_handover_url: Url,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Navigate to the next hop of the handover.
    Redirect(Url),
    /// The handover is over; navigate to the original target.
    Complete(Url),
}

impl Transition {
    #[must_use]
    pub fn url(&self) -> &Url {
        match self {
            Transition::Redirect(url) | Transition::Complete(url) => url,
        }
    }

    #[must_use]
    pub fn into_url(self) -> Url {
        match self {
            Transition::Redirect(url) | Transition::Complete(url) => url,
        }
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        matches!(self, Transition::Complete(_))
    }
}

/// Protocol state decoded from a landing URL. Decoding strips the
/// parameters the stage consumes, leaving the rest of the URL in place.
enum Landing {
    Outbound,
    CookieReturn {
        target: String,
        cookies: String,
    },
    TokenReturn {
        target: String,
        cookies: String,
        token: SecretString,
    },
}

impl Landing {
    fn take(url: &mut Url) -> Result<Self, Error> {
        let stage: Stage = get_param(url, STAGE_PARAM).unwrap_or_default().parse()?;

        match stage {
            Stage::Outbound => {
                require(RETURN_PARAM, get_param(url, RETURN_PARAM).unwrap_or_default())?;
                Ok(Landing::Outbound)
            }
            Stage::CookieReturn => {
                require_present(url, COOKIES_PARAM)?;
                let mut values = strip_params(url, &[COOKIES_PARAM, RETURN_PARAM]).into_iter();
                let cookies = values.next().unwrap_or_default();
                let target = require(RETURN_PARAM, values.next().unwrap_or_default())?;
                Ok(Landing::CookieReturn { target, cookies })
            }
            Stage::TokenReturn => {
                require_present(url, COOKIES_PARAM)?;
                let mut values =
                    strip_params(url, &[RETURN_PARAM, COOKIES_PARAM, TOKEN_PARAM]).into_iter();
                let target = require(RETURN_PARAM, values.next().unwrap_or_default())?;
                let cookies = values.next().unwrap_or_default();
                let token = require(TOKEN_PARAM, values.next().unwrap_or_default())?;
                Ok(Landing::TokenReturn {
                    target,
                    cookies,
                    token: SecretString::from(token),
                })
            }
            Stage::ForcedAuthReturn => Err(Error::UnexpectedStage(stage)),
        }
    }
}

/// An empty cookie string is valid; a missing one is not.
fn require_present(url: &Url, name: &'static str) -> Result<(), Error> {
    get_param(url, name).map(|_| ()).ok_or(Error::MissingParam(name))
}

fn require(name: &'static str, value: String) -> Result<String, Error> {
    if value.is_empty() {
        Err(Error::MissingParam(name))
    } else {
        Ok(value)
    }
}

/// Compute the next navigation for a landing page at `current_url`.
///
/// # Errors
/// Fails when the stage is missing or unknown, when a parameter the stage
/// needs is absent, or when the store cannot be read or written. None of
/// these are recoverable: resuming at a guessed stage could leak or
/// desynchronize credentials.
#[instrument(skip_all, fields(path = current_url.path()))]
pub fn next_hop(
    current_url: &Url,
    endpoints: &HandoverEndpoints,
    store: &AuthStore,
) -> Result<Transition, Error> {
    let mut landing = current_url.clone();

    match Landing::take(&mut landing)? {
        Landing::Outbound => {
            set_params(&mut landing, &[(STAGE_PARAM, Stage::CookieReturn.as_str())]);

            debug!("outbound hop, handing over to cookie endpoint");

            Ok(Transition::Redirect(create_url_with_params(
                &endpoints.cookie_handover_url,
                &[(RETURN_PARAM, landing.as_str())],
            )))
        }

        Landing::CookieReturn { target, cookies } => {
            if store.is_stored_auth_current(&cookies)? {
                info!("stored auth is current, skipping token exchange");

                return Ok(Transition::Complete(current_url.join(&target)?));
            }

            set_params(
                &mut landing,
                &[
                    (STAGE_PARAM, Stage::TokenReturn.as_str()),
                    (RETURN_PARAM, &target),
                    (COOKIES_PARAM, &cookies),
                ],
            );

            debug!("stored auth is stale, handing over to token endpoint");

            Ok(Transition::Redirect(create_url_with_params(
                &endpoints.token_handover_url,
                &[(RETURN_PARAM, landing.as_str()), (COOKIES_PARAM, &cookies)],
            )))
        }

        Landing::TokenReturn {
            target,
            cookies,
            token,
        } => {
            let target = current_url.join(&target)?;

            store.store_auth(&cookies, &token)?;

            info!("stored refreshed auth, handover complete");

            Ok(Transition::Complete(target))
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::protocol::{create_outbound_url, FileStore, KeyValueStore, MemoryStore, ReplicaSet};
    use serde_json::Value;
    use std::sync::Arc;

    const TARGET: &str = "https://apps.test/back-office/Orders?status=open&page=2#row-7";

    fn endpoints() -> HandoverEndpoints {
        HandoverEndpoints {
            cookie_handover_url: Url::parse("https://cms.test/cookie-handover").unwrap(),
            token_handover_url: Url::parse("https://cms.test/token-handover?v=2").unwrap(),
        }
    }

    fn store() -> (Arc<MemoryStore>, AuthStore) {
        let memory = Arc::new(MemoryStore::new());
        let store = AuthStore::new(memory.clone(), ReplicaSet::default());
        (memory, store)
    }

    fn landing(params: &[(&str, &str)]) -> Url {
        create_url_with_params(&Url::parse("https://apps.test/handover").unwrap(), params)
    }

    #[test]
    fn missing_stage_is_fatal() {
        let (_, store) = store();
        let url = Url::parse("https://apps.test/handover?r=x").unwrap();

        let err = next_hop(&url, &endpoints(), &store).err().unwrap();

        assert!(matches!(err, Error::UnknownStage(ref stage) if stage.is_empty()));
        assert!(err.to_string().contains("unknown or empty handover stage"));
    }

    #[test]
    fn unknown_stage_is_fatal() {
        let (_, store) = store();
        let url = landing(&[("stage", "os-sideways"), ("r", TARGET)]);

        let err = next_hop(&url, &endpoints(), &store).err();

        assert!(matches!(err, Some(Error::UnknownStage(ref stage)) if stage == "os-sideways"));
    }

    #[test]
    fn forced_return_is_not_a_landing_stage() {
        let (_, store) = store();
        let url = landing(&[("stage", "os-forced-auth-return")]);

        let err = next_hop(&url, &endpoints(), &store).err();

        assert!(matches!(err, Some(Error::UnexpectedStage(Stage::ForcedAuthReturn))));
    }

    #[test]
    fn outbound_redirects_through_cookie_handover() {
        let (_, store) = store();
        let handover = Url::parse("https://apps.test/handover").unwrap();
        let outbound = create_outbound_url(&handover, TARGET);

        let transition = next_hop(&outbound, &endpoints(), &store).unwrap();

        let Transition::Redirect(next) = transition else {
            panic!("expected redirect");
        };
        assert_eq!(next.host_str(), Some("cms.test"));
        assert_eq!(next.path(), "/cookie-handover");

        let nested = Url::parse(&get_param(&next, "r").unwrap()).unwrap();
        assert_eq!(nested.path(), "/handover");
        assert_eq!(get_param(&nested, "stage").as_deref(), Some("os-cookie-return"));
        assert_eq!(get_param(&nested, "r").as_deref(), Some(TARGET));
    }

    #[test]
    fn outbound_without_target_is_rejected() {
        let (_, store) = store();
        let url = landing(&[("stage", "os-outbound")]);

        let err = next_hop(&url, &endpoints(), &store).err();

        assert!(matches!(err, Some(Error::MissingParam("r"))));
    }

    #[test]
    fn cookie_return_short_circuits_when_cached() {
        let (_, store) = store();
        store
            .store_auth("sid=1; lang=en", &SecretString::from("tok".to_string()))
            .unwrap();
        let url = landing(&[("stage", "os-cookie-return"), ("r", TARGET), ("cc", "lang=en;sid=1")]);

        let transition = next_hop(&url, &endpoints(), &store).unwrap();

        assert_eq!(transition, Transition::Complete(Url::parse(TARGET).unwrap()));
    }

    #[test]
    fn cookie_return_exchanges_token_when_stale() {
        let (memory, store) = store();
        store.store_auth("sid=1", &SecretString::from("tok".to_string())).unwrap();
        memory.set("back-office:Cookies", "sid=0").unwrap();
        let url = landing(&[("stage", "os-cookie-return"), ("r", TARGET), ("cc", "sid=1")]);

        let transition = next_hop(&url, &endpoints(), &store).unwrap();

        let Transition::Redirect(next) = transition else {
            panic!("expected redirect");
        };
        assert_eq!(next.origin(), endpoints().token_handover_url.origin());
        assert_eq!(next.path(), "/token-handover");
        assert_eq!(get_param(&next, "v").as_deref(), Some("2"));
        assert_eq!(get_param(&next, "cc").as_deref(), Some("sid=1"));

        let nested = Url::parse(&get_param(&next, "r").unwrap()).unwrap();
        assert_eq!(get_param(&nested, "stage").as_deref(), Some("os-token-return"));
        assert_eq!(get_param(&nested, "r").as_deref(), Some(TARGET));
        assert_eq!(get_param(&nested, "cc").as_deref(), Some("sid=1"));
    }

    #[test]
    fn cookie_return_without_cookies_is_rejected() {
        let (_, store) = store();
        let url = landing(&[("stage", "os-cookie-return"), ("r", TARGET)]);

        let err = next_hop(&url, &endpoints(), &store).err();

        assert!(matches!(err, Some(Error::MissingParam("cc"))));
    }

    #[test]
    fn token_return_without_cookies_writes_nothing() {
        let (memory, store) = store();
        let url = landing(&[("stage", "os-token-return"), ("r", TARGET), ("cms-modern-token", "tok")]);

        let err = next_hop(&url, &endpoints(), &store).err();

        assert!(matches!(err, Some(Error::MissingParam("cc"))));
        assert_eq!(memory.get("case-management:Cookies").unwrap(), None);
    }

    #[test]
    fn token_return_persists_through_file_store() {
        let path = std::env::temp_dir().join(format!("handover-{}-machine.json", std::process::id()));
        let _ = std::fs::remove_file(&path);
        let store = AuthStore::new(Arc::new(FileStore::open(&path).unwrap()), ReplicaSet::default());
        let url = landing(&[
            ("stage", "os-token-return"),
            ("r", TARGET),
            ("cc", "sid=7"),
            ("cms-modern-token", "tok"),
        ]);

        let transition = next_hop(&url, &endpoints(), &store).unwrap();
        assert!(transition.is_complete());

        let reopened = AuthStore::new(Arc::new(FileStore::open(&path).unwrap()), ReplicaSet::default());
        assert!(reopened.is_stored_auth_current("sid=7").unwrap());
        assert_eq!(reopened.record("customer-portal").unwrap().unwrap().token, "tok");

        let cached = landing(&[("stage", "os-cookie-return"), ("r", TARGET), ("cc", "sid=7")]);
        assert!(next_hop(&cached, &endpoints(), &reopened).unwrap().is_complete());

        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn cookie_return_with_empty_store_is_stale() {
        let (_, store) = store();
        let url = landing(&[("stage", "os-cookie-return"), ("r", TARGET), ("cc", "")]);

        let transition = next_hop(&url, &endpoints(), &store).unwrap();

        assert!(!transition.is_complete());
    }

    #[test]
    fn token_return_writes_every_replica() {
        let (memory, store) = store();
        let url = landing(&[
            ("stage", "os-token-return"),
            ("r", TARGET),
            ("cc", "a=1"),
            ("cms-modern-token", "tok"),
        ]);

        let transition = next_hop(&url, &endpoints(), &store).unwrap();

        assert_eq!(transition, Transition::Complete(Url::parse(TARGET).unwrap()));
        for replica in store.replicas().iter() {
            assert_eq!(memory.get(replica.cookie_key()).unwrap().as_deref(), Some("a=1"));

            let raw = memory.get(replica.record_key()).unwrap().unwrap();
            let json: Value = serde_json::from_str(&raw).unwrap();
            assert_eq!(json["Cookies"], "a=1");
            assert_eq!(json["Token"], "tok");
            assert!(json["ExpiryTime"].is_string());
        }
    }

    #[test]
    fn token_return_without_token_writes_nothing() {
        let (memory, store) = store();
        let url = landing(&[("stage", "os-token-return"), ("r", TARGET), ("cc", "a=1")]);

        let err = next_hop(&url, &endpoints(), &store).err();

        assert!(matches!(err, Some(Error::MissingParam("cms-modern-token"))));
        assert_eq!(memory.get("case-management:Cookies").unwrap(), None);
    }

    #[test]
    fn relative_target_resolves_against_landing() {
        let (_, store) = store();
        let url = landing(&[
            ("stage", "os-token-return"),
            ("r", "/customer-portal/Home?x=1"),
            ("cc", "a=1"),
            ("cms-modern-token", "tok"),
        ]);

        let transition = next_hop(&url, &endpoints(), &store).unwrap();

        assert_eq!(
            transition.url().as_str(),
            "https://apps.test/customer-portal/Home?x=1"
        );
    }
}
