//! `ftax fetch` — pull per-identifier breakdown JSON into the data directory.
//!
//! The data directory doubles as the on-disk response cache: identifiers that
//! already have a file are skipped unless `--refresh` is given, so repeated
//! runs do not hammer the upstream source.

use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crate::exit_codes;
use crate::CliError;

const MAX_RETRIES: u32 = 3;
const TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("ftax/", env!("CARGO_PKG_VERSION"));

/// HTTP client with retry / backoff / error classification.
///
/// Auth errors fail immediately; 429 and 5xx retry with exponential backoff,
/// honoring `Retry-After`; network errors retry the same way.
struct FetchClient {
    http: reqwest::blocking::Client,
}

impl FetchClient {
    fn new() -> Result<Self, CliError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CliError {
                code: exit_codes::EXIT_ERROR,
                message: format!("failed to build HTTP client: {e}"),
                hint: None,
            })?;
        Ok(Self { http })
    }

    fn get_with_retry(&self, url: &str, api_key: Option<&str>) -> Result<String, CliError> {
        let mut backoff_secs = 1u64;

        for attempt in 0..=MAX_RETRIES {
            let mut request = self.http.get(url);
            if let Some(key) = api_key {
                request = request.bearer_auth(key);
            }

            match request.send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if status == 401 || status == 403 {
                        return Err(CliError {
                            code: exit_codes::EXIT_FETCH_AUTH,
                            message: format!("auth failed ({status}) for {url}"),
                            hint: Some("pass --api-key or set FOLIOTAX_API_KEY".into()),
                        });
                    }
                    if status >= 400 && status < 500 && status != 429 {
                        return Err(CliError {
                            code: exit_codes::EXIT_FETCH_UPSTREAM,
                            message: format!("upstream rejected request ({status}) for {url}"),
                            hint: None,
                        });
                    }
                    if status == 429 || status >= 500 {
                        if attempt == MAX_RETRIES {
                            let code = if status == 429 {
                                exit_codes::EXIT_FETCH_RATE_LIMIT
                            } else {
                                exit_codes::EXIT_FETCH_UPSTREAM
                            };
                            return Err(CliError {
                                code,
                                message: format!(
                                    "HTTP {status} after {MAX_RETRIES} attempts for {url}"
                                ),
                                hint: None,
                            });
                        }
                        let wait = if status == 429 {
                            resp.headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse::<u64>().ok())
                                .unwrap_or(backoff_secs)
                        } else {
                            backoff_secs
                        };
                        eprintln!("warning: retry {}/{MAX_RETRIES} in {wait}s (HTTP {status})", attempt + 1);
                        thread::sleep(Duration::from_secs(wait));
                        backoff_secs *= 2;
                        continue;
                    }

                    return resp.text().map_err(|e| CliError {
                        code: exit_codes::EXIT_FETCH_UPSTREAM,
                        message: format!("failed to read response body: {e}"),
                        hint: None,
                    });
                }
                Err(e) => {
                    if attempt == MAX_RETRIES {
                        return Err(CliError {
                            code: exit_codes::EXIT_FETCH_UPSTREAM,
                            message: format!("upstream error after {MAX_RETRIES} attempts: {e}"),
                            hint: None,
                        });
                    }
                    eprintln!("warning: retry {}/{MAX_RETRIES} in {backoff_secs}s ({e})", attempt + 1);
                    thread::sleep(Duration::from_secs(backoff_secs));
                    backoff_secs *= 2;
                }
            }
        }

        unreachable!()
    }
}

pub fn cmd_fetch(
    portfolio_path: PathBuf,
    data_dir: PathBuf,
    base_url: String,
    api_key: Option<String>,
    refresh: bool,
) -> Result<(), CliError> {
    if !base_url.starts_with("https://") {
        return Err(CliError {
            code: exit_codes::EXIT_USAGE,
            message: "only HTTPS base URLs are allowed".into(),
            hint: Some(format!("change {base_url} to https://")),
        });
    }
    let base_url = base_url.trim_end_matches('/');

    let document = foliotax_io::portfolio::load(&portfolio_path)
        .map_err(|e| CliError::document(e.to_string()))?;

    std::fs::create_dir_all(&data_dir)
        .map_err(|e| CliError::persist(format!("cannot create {}: {e}", data_dir.display())))?;

    let client = FetchClient::new()?;
    let mut fetched = 0usize;
    let mut skipped = 0usize;

    for security in &document.securities {
        let target = data_dir.join(format!("{}.json", security.identifier));
        if target.exists() && !refresh {
            skipped += 1;
            continue;
        }

        let url = format!("{base_url}/{}.json", security.identifier);
        let body = client.get_with_retry(&url, api_key.as_deref())?;

        // reject non-JSON payloads before they poison the data directory
        serde_json::from_str::<serde_json::Value>(&body).map_err(|e| CliError {
            code: exit_codes::EXIT_FETCH_UPSTREAM,
            message: format!("{}: response is not JSON: {e}", security.identifier),
            hint: None,
        })?;

        std::fs::write(&target, &body)
            .map_err(|e| CliError::persist(format!("cannot write {}: {e}", target.display())))?;
        fetched += 1;
    }

    eprintln!("fetched {fetched} breakdown(s), {skipped} cached");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_base_url_is_rejected() {
        let err = cmd_fetch(
            PathBuf::from("depot.xml"),
            PathBuf::from("data"),
            "http://insecure.example.com".into(),
            None,
            false,
        )
        .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_USAGE);
        assert!(err.hint.unwrap().contains("https://"));
    }

    #[test]
    fn missing_portfolio_is_a_document_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_fetch(
            dir.path().join("nope.xml"),
            dir.path().join("data"),
            "https://data.example.com/breakdowns".into(),
            None,
            false,
        )
        .unwrap_err();
        assert_eq!(err.code, exit_codes::EXIT_DOCUMENT);
    }
}
