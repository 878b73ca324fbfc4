//! Parser for `.netrc` credential stores.
//!
//! Supports the `machine`, `default`, `login`, `password`, `account` and
//! `macdef` keywords. Macro bodies are skipped up to the next blank line and
//! `#` starts a comment that runs to the end of the line.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetrcError {
    #[error("line {line}: unexpected token {token:?}")]
    UnexpectedToken { line: usize, token: String },

    #[error("line {line}: {keyword:?} appears outside of a machine entry")]
    OutsideMachine { line: usize, keyword: String },

    #[error("missing value after {keyword:?}")]
    MissingValue { keyword: String },
}

/// A single `machine` (or `default`) entry.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Machine {
    /// Host name; `None` for the `default` entry.
    pub name: Option<String>,
    pub login: String,
    pub password: String,
    pub account: String,
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine")
            .field("name", &self.name)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("account", &self.account)
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Netrc {
    machines: Vec<Machine>,
}

impl Netrc {
    pub fn parse(input: &str) -> Result<Self, NetrcError> {
        let mut machines = Vec::new();
        let mut current: Option<Machine> = None;
        let mut pending: Option<(&str, usize)> = None;
        let mut in_macdef = false;

        for (index, line) in input.lines().enumerate() {
            let line_no = index + 1;

            if in_macdef {
                if line.trim().is_empty() {
                    in_macdef = false;
                }
                continue;
            }

            for token in line.split_whitespace() {
                if token.starts_with('#') {
                    break;
                }

                if let Some((keyword, keyword_line)) = pending.take() {
                    match keyword {
                        "machine" => {
                            machines.extend(current.take());
                            current = Some(Machine {
                                name: Some(token.to_string()),
                                ..Default::default()
                            });
                        }
                        "macdef" => {
                            // The body starts on the next line.
                            in_macdef = true;
                            break;
                        }
                        field => {
                            let machine = current.as_mut().ok_or_else(|| {
                                NetrcError::OutsideMachine {
                                    line: keyword_line,
                                    keyword: field.to_string(),
                                }
                            })?;
                            let value = token.to_string();
                            match field {
                                "login" => machine.login = value,
                                "password" => machine.password = value,
                                _ => machine.account = value,
                            }
                        }
                    }
                    continue;
                }

                match token {
                    "machine" | "login" | "password" | "account" | "macdef" => {
                        pending = Some((token, line_no));
                    }
                    "default" => {
                        machines.extend(current.take());
                        current = Some(Machine::default());
                    }
                    other => {
                        return Err(NetrcError::UnexpectedToken {
                            line: line_no,
                            token: other.to_string(),
                        });
                    }
                }
            }
        }

        if let Some((keyword, _)) = pending {
            return Err(NetrcError::MissingValue {
                keyword: keyword.to_string(),
            });
        }
        machines.extend(current);

        Ok(Self { machines })
    }

    /// Finds the entry for `host`, falling back to the `default` entry.
    ///
    /// A `host:port` key also matches an entry for the bare host.
    pub fn find_machine(&self, host: &str) -> Option<&Machine> {
        self.machine(host)
            .or_else(|| host.rsplit_once(':').and_then(|(name, _)| self.machine(name)))
            .or_else(|| self.default_machine())
    }

    /// The entry named exactly `host`.
    pub fn machine(&self, host: &str) -> Option<&Machine> {
        self.machines.iter().find(|m| m.name.as_deref() == Some(host))
    }

    pub fn default_machine(&self) -> Option<&Machine> {
        self.machines.iter().find(|m| m.name.is_none())
    }

    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_line_entries() {
        let netrc = Netrc::parse(
            "machine api.enterprise.apigee.com login alice password s3cret\n\
             machine other.example.com login bob password hunter2 account ops\n",
        )
        .unwrap();

        assert_eq!(netrc.machines().len(), 2);
        let m = netrc.find_machine("api.enterprise.apigee.com").unwrap();
        assert_eq!(m.login, "alice");
        assert_eq!(m.password, "s3cret");

        let m = netrc.find_machine("other.example.com").unwrap();
        assert_eq!(m.account, "ops");
    }

    #[test]
    fn test_parse_multi_line_entry_with_comments() {
        let netrc = Netrc::parse(
            "# edge credentials\n\
             machine edge.local   # on-prem\n\
             \tlogin admin\n\
             \tpassword pw\n",
        )
        .unwrap();

        let m = netrc.find_machine("edge.local").unwrap();
        assert_eq!(m.login, "admin");
        assert_eq!(m.password, "pw");
    }

    #[test]
    fn test_default_entry_is_fallback() {
        let netrc = Netrc::parse(
            "machine a.example.com login a password pa\n\
             default login anon password pd\n",
        )
        .unwrap();

        assert_eq!(netrc.find_machine("a.example.com").unwrap().login, "a");
        let fallback = netrc.find_machine("unknown.example.com").unwrap();
        assert_eq!(fallback.name, None);
        assert_eq!(fallback.login, "anon");
    }

    #[test]
    fn test_macdef_body_is_skipped() {
        let netrc = Netrc::parse(
            "macdef init\n\
             cd /pub\n\
             machine fake login x password y\n\
             \n\
             machine real.example.com login r password rp\n",
        )
        .unwrap();

        assert!(netrc.find_machine("fake").is_none());
        assert_eq!(netrc.find_machine("real.example.com").unwrap().login, "r");
    }

    #[test]
    fn test_host_with_port_lookup() {
        let netrc = Netrc::parse(
            "machine edge.local login bare password pb\n\
             machine edge.local:8080 login exact password pe\n",
        )
        .unwrap();

        assert_eq!(netrc.find_machine("edge.local:8080").unwrap().login, "exact");
        assert_eq!(netrc.find_machine("edge.local:9000").unwrap().login, "bare");
        assert!(netrc.find_machine("other.local:8080").is_none());
    }

    #[test]
    fn test_missing_machine_returns_none() {
        let netrc = Netrc::parse("machine a.example.com login a password pa").unwrap();
        assert!(netrc.find_machine("b.example.com").is_none());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Netrc::parse("login alice").unwrap_err(),
            NetrcError::OutsideMachine {
                line: 1,
                keyword: "login".to_string()
            }
        );
        assert_eq!(
            Netrc::parse("machine a.example.com\nbogus").unwrap_err(),
            NetrcError::UnexpectedToken {
                line: 2,
                token: "bogus".to_string()
            }
        );
        assert_eq!(
            Netrc::parse("machine a.example.com login").unwrap_err(),
            NetrcError::MissingValue {
                keyword: "login".to_string()
            }
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let netrc = Netrc::parse("machine h login u password topsecret").unwrap();
        let debug = format!("{:?}", netrc);
        assert!(!debug.contains("topsecret"));
    }
}
