//! Renders the one-time `session.ini` handed to the server.
//!
//! The file layers on top of the system defaults and the package
//! `usercouch.ini`. Sections are emitted in a fixed order so sessions with
//! identical inputs produce identical files.

use usercouch_config::AuthMode;

use crate::options::SessionConfig;
use crate::paths::Paths;
use crate::random::CredentialError;

/// Package defaults written next to the session file at bootstrap.
pub const PACKAGE_INI: &str = include_str!("../data/usercouch.ini");

/// Ports the session listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenPorts {
    /// HTTP port.
    pub http: u16,
    /// HTTPS port, when TLS is configured.
    pub ssl: Option<u16>,
}

/// Renders the session configuration, appending `extra` verbatim.
pub fn render_session_ini(
    session: &SessionConfig,
    paths: &Paths,
    ports: ListenPorts,
    extra: Option<&str>,
) -> Result<String, CredentialError> {
    let mut ini = String::new();
    push_base(&mut ini, session, paths, ports.http);
    if let Some(credentials) = &session.credentials {
        push(
            &mut ini,
            format_args!(
                "\n[couch_httpd_auth]\nrequire_valid_user = true\n\n[admins]\n{} = {}\n",
                credentials.username,
                credentials.hashed()?
            ),
        );
        if let (AuthMode::Oauth, Some(oauth)) = (session.auth, &session.oauth) {
            push(
                &mut ini,
                format_args!(
                    "\n[oauth_token_users]\n{token} = {username}\n\
                     \n[oauth_token_secrets]\n{token} = {token_secret}\n\
                     \n[oauth_consumer_secrets]\n{consumer_key} = {consumer_secret}\n",
                    token = oauth.token,
                    username = credentials.username,
                    token_secret = oauth.token_secret,
                    consumer_key = oauth.consumer_key,
                    consumer_secret = oauth.consumer_secret,
                ),
            );
        }
    }
    if let (Some(ssl), Some(ssl_port)) = (&session.ssl, ports.ssl) {
        push(
            &mut ini,
            format_args!(
                "\n[daemons]\nhttpsd = {{couch_httpd, start_link, [https]}}\n\
                 \n[ssl]\nport = {ssl_port}\ncert_file = {}\nkey_file = {}\n",
                ssl.cert_file.display(),
                ssl.key_file.display(),
            ),
        );
    }
    if let Some(replicator) = &session.replicator {
        push(
            &mut ini,
            format_args!(
                "\n[replicator]\nverify_ssl_certificates = true\n\
                 ssl_certificate_max_depth = {}\nssl_trusted_certificates_file = {}\n",
                replicator.max_depth,
                replicator.ca_file.display(),
            ),
        );
        if let Some((cert_file, key_file)) = replicator.client_cert() {
            push(
                &mut ini,
                format_args!(
                    "cert_file = {}\nkey_file = {}\n",
                    cert_file.display(),
                    key_file.display()
                ),
            );
        }
    }
    if let Some(extra) = extra {
        ini.push_str(extra);
    }
    Ok(ini)
}

fn push_base(ini: &mut String, session: &SessionConfig, paths: &Paths, port: u16) {
    push(
        ini,
        format_args!(
            "[httpd]\nbind_address = {}\nport = {port}\n\
             \n[couchdb]\ndatabase_dir = {}\nview_index_dir = {}\nfile_compression = {}\n\
             \n[log]\nfile = {}\nlevel = {}\n",
            session.bind_address,
            paths.databases().display(),
            paths.views().display(),
            session.file_compression,
            paths.logfile().display(),
            session.loglevel,
        ),
    );
}

fn push(ini: &mut String, args: std::fmt::Arguments<'_>) {
    ini.push_str(&std::fmt::format(args));
}

#[cfg(test)]
mod tests {
    use std::fs;

    use rstest::{fixture, rstest};
    use tempfile::TempDir;
    use usercouch_config::{BindAddress, FileCompression};

    use super::*;
    use crate::options::{Options, ReplicatorOptions, SslOptions};
    use crate::random::OAuthTokens;

    struct Layout {
        dir: TempDir,
        paths: Paths,
    }

    #[fixture]
    fn layout() -> Layout {
        let dir = TempDir::new().expect("temp dir");
        let paths = Paths::prepare(dir.path()).expect("paths");
        for name in ["cert.pem", "key.pem", "ca.pem"] {
            fs::write(dir.path().join(name), b"pem").expect("write pem");
        }
        Layout { dir, paths }
    }

    fn base_section(layout: &Layout, port: u16) -> String {
        let base = layout.dir.path();
        format!(
            "[httpd]\nbind_address = 127.0.0.1\nport = {port}\n\n\
             [couchdb]\ndatabase_dir = {}\nview_index_dir = {}\nfile_compression = snappy\n\n\
             [log]\nfile = {}\nlevel = notice\n",
            base.join("databases").display(),
            base.join("views").display(),
            base.join("log/couchdb.log").display(),
        )
    }

    #[rstest]
    fn open_session_has_only_base_sections(layout: Layout) {
        let session = Options::default()
            .resolve(AuthMode::Open)
            .expect("valid options");
        let ini = render_session_ini(
            &session,
            &layout.paths,
            ListenPorts {
                http: 5984,
                ssl: None,
            },
            None,
        )
        .expect("render");
        assert_eq!(ini, base_section(&layout, 5984));
    }

    #[rstest]
    fn basic_session_stores_only_the_hash(layout: Layout) {
        let options = Options {
            username: Some("joe".to_owned()),
            password: Some("secret".to_owned()),
            salt: Some("da52c844db4b8bd88ebb96d72542457a".to_owned()),
            ..Options::default()
        };
        let session = options.resolve(AuthMode::Basic).expect("valid options");
        let ini = render_session_ini(
            &session,
            &layout.paths,
            ListenPorts {
                http: 5984,
                ssl: None,
            },
            None,
        )
        .expect("render");
        let expected = format!(
            "{}\n[couch_httpd_auth]\nrequire_valid_user = true\n\n[admins]\n\
             joe = -hashed-ddf425840fd7f81cc45d9e9f5aa484d1f60964a9,da52c844db4b8bd88ebb96d72542457a\n",
            base_section(&layout, 5984)
        );
        assert_eq!(ini, expected);
        assert!(!ini.contains("secret\n"));
    }

    #[rstest]
    fn oauth_session_maps_tokens(layout: Layout) {
        let options = Options {
            username: Some("joe".to_owned()),
            oauth: Some(OAuthTokens {
                consumer_key: "ck".to_owned(),
                consumer_secret: "cs".to_owned(),
                token: "tk".to_owned(),
                token_secret: "ts".to_owned(),
            }),
            ..Options::default()
        };
        let session = options.resolve(AuthMode::Oauth).expect("valid options");
        let ini = render_session_ini(
            &session,
            &layout.paths,
            ListenPorts {
                http: 5984,
                ssl: None,
            },
            None,
        )
        .expect("render");
        assert!(ini.ends_with(
            "\n[oauth_token_users]\ntk = joe\n\n[oauth_token_secrets]\ntk = ts\n\n\
             [oauth_consumer_secrets]\nck = cs\n"
        ));
    }

    #[rstest]
    fn ssl_and_replicator_sections_follow_auth(layout: Layout) {
        let base = layout.dir.path();
        let options = Options {
            bind_address: BindAddress::Any,
            file_compression: FileCompression::Deflate1,
            ssl: Some(SslOptions::new(base.join("cert.pem"), base.join("key.pem"))),
            replicator: Some(
                ReplicatorOptions::new(base.join("ca.pem"))
                    .with_client_cert(base.join("cert.pem"), base.join("key.pem")),
            ),
            ..Options::default()
        };
        let session = options.resolve(AuthMode::Open).expect("valid options");
        let ini = render_session_ini(
            &session,
            &layout.paths,
            ListenPorts {
                http: 5984,
                ssl: Some(6984),
            },
            Some("[stats]\nsamples = [0]\n"),
        )
        .expect("render");
        assert!(ini.starts_with("[httpd]\nbind_address = 0.0.0.0\n"));
        assert!(ini.contains("file_compression = deflate_1\n"));
        let tail = format!(
            "\n[daemons]\nhttpsd = {{couch_httpd, start_link, [https]}}\n\n\
             [ssl]\nport = 6984\ncert_file = {cert}\nkey_file = {key}\n\n\
             [replicator]\nverify_ssl_certificates = true\nssl_certificate_max_depth = 1\n\
             ssl_trusted_certificates_file = {ca}\ncert_file = {cert}\nkey_file = {key}\n\
             [stats]\nsamples = [0]\n",
            cert = base.join("cert.pem").display(),
            key = base.join("key.pem").display(),
            ca = base.join("ca.pem").display(),
        );
        assert!(ini.ends_with(&tail), "unexpected ini:\n{ini}");
    }

    #[rstest]
    fn replicator_without_client_cert_only_trusts_the_ca(layout: Layout) {
        let base = layout.dir.path();
        let options = Options {
            replicator: Some(ReplicatorOptions::new(base.join("ca.pem"))),
            ..Options::default()
        };
        let session = options.resolve(AuthMode::Open).expect("valid options");
        let ini = render_session_ini(
            &session,
            &layout.paths,
            ListenPorts {
                http: 5984,
                ssl: None,
            },
            None,
        )
        .expect("render");
        let expected = format!(
            "{}
[replicator]
verify_ssl_certificates = true
ssl_certificate_max_depth = 1
             ssl_trusted_certificates_file = {}
",
            base_section(&layout, 5984),
            base.join("ca.pem").display(),
        );
        assert_eq!(ini, expected);
    }

    #[rstest]
    fn ipv6_bind_is_written_verbatim(layout: Layout) {
        let options = Options {
            bind_address: BindAddress::LoopbackV6,
            ..Options::default()
        };
        let session = options.resolve(AuthMode::Open).expect("valid options");
        let ini = render_session_ini(
            &session,
            &layout.paths,
            ListenPorts {
                http: 5984,
                ssl: None,
            },
            None,
        )
        .expect("render");
        assert!(ini.starts_with("[httpd]\nbind_address = ::1\nport = 5984\n"));
    }

    #[test]
    fn package_ini_is_not_empty() {
        assert!(PACKAGE_INI.contains('['));
    }
}
