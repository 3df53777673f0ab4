//! First hops of a handover, built by whoever wants the user authenticated.

use url::Url;

use super::{create_url_with_params, Stage, RETURN_PARAM, STAGE_PARAM};

/// `handover_url?stage=os-outbound&r=<target>`, the full round trip.
#[must_use]
pub fn create_outbound_url(handover_url: &Url, target_url: &str) -> Url {
    create_url_with_params(
        handover_url,
        &[
            (STAGE_PARAM, Stage::Outbound.as_str()),
            (RETURN_PARAM, target_url),
        ],
    )
}

/// Skip the outbound hop and point straight at the cookie handover:
/// `cookie_handover_url?r=<handover_url?stage=os-cookie-return&r=<target>>`.
#[must_use]
pub fn create_outbound_url_direct(cookie_handover_url: &Url, handover_url: &Url, target_url: &str) -> Url {
    let landing = create_url_with_params(
        handover_url,
        &[
            (STAGE_PARAM, Stage::CookieReturn.as_str()),
            (RETURN_PARAM, target_url),
        ],
    );

    create_url_with_params(cookie_handover_url, &[(RETURN_PARAM, landing.as_str())])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::protocol::get_param;

    const TARGET: &str = "https://apps.test/case-management/Detail?id=42&tab=a%20b#notes";

    #[test]
    fn outbound_sets_stage_and_target() {
        let handover = Url::parse("https://apps.test/handover").unwrap();

        let url = create_outbound_url(&handover, TARGET);

        assert_eq!(url.path(), "/handover");
        assert_eq!(get_param(&url, "stage").as_deref(), Some("os-outbound"));
        assert_eq!(get_param(&url, "r").as_deref(), Some(TARGET));
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn direct_nests_landing_inside_cookie_handover() {
        let cookies = Url::parse("https://cms.test/cookie-handover").unwrap();
        let handover = Url::parse("https://apps.test/handover").unwrap();

        let url = create_outbound_url_direct(&cookies, &handover, TARGET);

        assert_eq!(url.host_str(), Some("cms.test"));
        assert_eq!(url.query_pairs().count(), 1);

        let landing = Url::parse(&get_param(&url, "r").unwrap()).unwrap();
        assert_eq!(landing.path(), "/handover");
        assert_eq!(get_param(&landing, "stage").as_deref(), Some("os-cookie-return"));
        assert_eq!(get_param(&landing, "r").as_deref(), Some(TARGET));
    }
}
