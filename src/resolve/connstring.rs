//! Minimal MongoDB connection-string parsing.
//!
//! Mongo URIs are not RFC 3986 URLs (comma-separated host lists), so this
//! parses only the parts resolution needs: scheme, hosts, and options.
//! Credentials, database name, and unrelated options are accepted and
//! ignored.

/// Recognized URI schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    /// `mongodb://`: direct host list.
    Mongodb,
    /// `mongodb+srv://`: DNS seed-list discovery.
    MongodbSrv,
}

/// Parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub scheme: Scheme,
    pub hosts: Vec<String>,
    /// Query options, keys lowercased.
    pub options: Vec<(String, String)>,
}

impl ConnectionString {
    pub fn parse(uri: &str) -> Result<Self, String> {
        let (scheme, rest) = if let Some(rest) = uri.strip_prefix("mongodb+srv://") {
            (Scheme::MongodbSrv, rest)
        } else if let Some(rest) = uri.strip_prefix("mongodb://") {
            (Scheme::Mongodb, rest)
        } else {
            return Err(format!("unsupported scheme in {uri:?}"));
        };

        // split off /database?options
        let (authority, tail) = match rest.find('/') {
            Some(i) => (&rest[..i], &rest[i + 1..]),
            None => match rest.find('?') {
                Some(i) => (&rest[..i], &rest[i..]),
                None => (rest, ""),
            },
        };

        // discard userinfo
        let host_list = match authority.rsplit_once('@') {
            Some((_, hosts)) => hosts,
            None => authority,
        };

        let hosts: Vec<String> = host_list
            .split(',')
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .collect();
        if hosts.is_empty() {
            return Err(format!("no hosts in {uri:?}"));
        }

        if scheme == Scheme::MongodbSrv {
            // the SRV form admits exactly one portless seed host
            if hosts.len() != 1 || hosts[0].contains(':') {
                return Err(format!("SRV URI must name exactly one portless host: {uri:?}"));
            }
        }

        let options = match tail.find('?') {
            Some(i) => tail[i + 1..]
                .split('&')
                .filter_map(|pair| {
                    let (k, v) = pair.split_once('=')?;
                    Some((k.to_ascii_lowercase(), v.to_string()))
                })
                .collect(),
            None => Vec::new(),
        };

        Ok(Self {
            scheme,
            hosts,
            options,
        })
    }

    fn option(&self, key: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// TLS policy derived from the `tls`/`ssl` options; SRV discovery
    /// defaults it on.
    pub fn use_tls(&self) -> bool {
        let flag = self.option("tls").or_else(|| self.option("ssl"));
        match flag {
            Some(v) => v.eq_ignore_ascii_case("true"),
            None => self.scheme == Scheme::MongodbSrv,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_uri_with_host_list() {
        let cs = ConnectionString::parse("mongodb://a:27017,b:27018/admin?replicaSet=rs0").unwrap();
        assert_eq!(cs.scheme, Scheme::Mongodb);
        assert_eq!(cs.hosts, vec!["a:27017", "b:27018"]);
        assert_eq!(cs.option("replicaset"), Some("rs0"));
        assert!(!cs.use_tls());
    }

    #[test]
    fn credentials_are_ignored() {
        let cs = ConnectionString::parse("mongodb://user:pass@db:27017").unwrap();
        assert_eq!(cs.hosts, vec!["db:27017"]);
    }

    #[test]
    fn tls_flag_variants() {
        let cs = ConnectionString::parse("mongodb://db/?tls=true").unwrap();
        assert!(cs.use_tls());
        let cs = ConnectionString::parse("mongodb://db/?ssl=TRUE").unwrap();
        assert!(cs.use_tls());
        let cs = ConnectionString::parse("mongodb+srv://cluster.example.com/?tls=false").unwrap();
        assert!(!cs.use_tls());
    }

    #[test]
    fn srv_defaults_tls_on() {
        let cs = ConnectionString::parse("mongodb+srv://cluster.example.com").unwrap();
        assert_eq!(cs.scheme, Scheme::MongodbSrv);
        assert!(cs.use_tls());
    }

    #[test]
    fn srv_rejects_ports_and_multiple_hosts() {
        assert!(ConnectionString::parse("mongodb+srv://a:27017").is_err());
        assert!(ConnectionString::parse("mongodb+srv://a,b").is_err());
    }

    #[test]
    fn unsupported_scheme_is_rejected() {
        assert!(ConnectionString::parse("postgres://db").is_err());
        assert!(ConnectionString::parse("db:27017").is_err());
    }

    #[test]
    fn query_without_database_segment() {
        let cs = ConnectionString::parse("mongodb://db:1?tls=true").unwrap();
        assert_eq!(cs.hosts, vec!["db:1"]);
        assert!(cs.use_tls());
    }
}
