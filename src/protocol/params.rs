//! Reading and rewriting protocol state carried in URL query strings.

use url::{form_urlencoded, Url};

/// Remove every occurrence of each key from the query string of `url`.
///
/// Returns the first value seen for each key, in the same order as `keys`,
/// or an empty string when the key was absent. The query is only rewritten
/// when at least one key was present, and the pairs left behind keep their
/// original encoding.
pub fn strip_params(url: &mut Url, keys: &[&str]) -> Vec<String> {
    let pairs = raw_pairs(url);

    let values = keys
        .iter()
        .map(|key| {
            pairs
                .iter()
                .find(|pair| pair.name == *key)
                .map(|pair| pair.value.clone())
                .unwrap_or_default()
        })
        .collect();

    if pairs.iter().any(|pair| keys.contains(&pair.name.as_str())) {
        let remaining: Vec<RawPair> = pairs
            .into_iter()
            .filter(|pair| !keys.contains(&pair.name.as_str()))
            .collect();

        write_query(url, &remaining);
    }

    values
}

/// Set each parameter to a single value, replacing any existing values for
/// that key. Keys not named in `params` keep their value, position and
/// encoding.
pub fn set_params(url: &mut Url, params: &[(&str, &str)]) {
    let mut pairs = raw_pairs(url);

    for (key, value) in params {
        let pair = RawPair::encode(key, value);

        match pairs.iter().position(|existing| existing.name == *key) {
            Some(index) => {
                pairs[index] = pair;
                let mut seen = 0usize;
                pairs.retain(|existing| {
                    if existing.name == *key {
                        seen += 1;
                        seen == 1
                    } else {
                        true
                    }
                });
            }
            None => pairs.push(pair),
        }
    }

    write_query(url, &pairs);
}

/// Copy `base` and apply [`set_params`] to the copy.
#[must_use]
pub fn create_url_with_params(base: &Url, params: &[(&str, &str)]) -> Url {
    let mut url = base.clone();
    set_params(&mut url, params);
    url
}

/// Read the first value of `key` without touching the URL.
#[must_use]
pub fn get_param(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(name, _)| name == key)
        .map(|(_, value)| value.into_owned())
}

/// One `name=value` segment of a query, decoded for matching and kept as
/// written for reserialization.
struct RawPair {
    raw: String,
    name: String,
    value: String,
}

impl RawPair {
    fn encode(name: &str, value: &str) -> Self {
        Self {
            raw: form_urlencoded::Serializer::new(String::new())
                .append_pair(name, value)
                .finish(),
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

fn raw_pairs(url: &Url) -> Vec<RawPair> {
    url.query()
        .unwrap_or_default()
        .split('&')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let (name, value) = form_urlencoded::parse(segment.as_bytes())
                .next()
                .map(|(name, value)| (name.into_owned(), value.into_owned()))
                .unwrap_or_default();

            RawPair {
                raw: segment.to_string(),
                name,
                value,
            }
        })
        .collect()
}

fn write_query(url: &mut Url, pairs: &[RawPair]) {
    if pairs.is_empty() {
        url.set_query(None);
    } else {
        let query = pairs
            .iter()
            .map(|pair| pair.raw.as_str())
            .collect::<Vec<_>>()
            .join("&");
        url.set_query(Some(&query));
    }
}
