#[cfg(test)]
#[cfg(feature = "smtp-transport")]
mod test {
    use std::{
        io::{BufRead, BufReader, Write},
        net::TcpListener,
        thread::{self, JoinHandle},
    };

    use pretty_assertions::assert_eq;
    use relaymail::{
        transport::smtp::{authentication::Credentials, extension::ClientId},
        Envelope, SmtpTransport, Transport,
    };

    /// Scripted server handling one session, returns everything it received
    struct TestServer {
        port: u16,
        handle: JoinHandle<String>,
    }

    impl TestServer {
        fn start(ehlo: &'static str, rcpt: fn(&str) -> &'static str) -> TestServer {
            // with the tracing feature, shows the exchange with --nocapture
            let _ = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::DEBUG)
                .with_test_writer()
                .try_init();

            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let port = listener.local_addr().unwrap().port();

            let handle = thread::spawn(move || {
                let (stream, _) = listener.accept().unwrap();
                let mut writer = stream.try_clone().unwrap();
                let mut reader = BufReader::new(stream);
                let mut received = String::new();
                let mut in_data = false;

                writer.write_all(b"220 test.example ESMTP\r\n").unwrap();
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap() == 0 {
                        break;
                    }
                    received.push_str(&line);

                    if in_data {
                        if line == ".\r\n" {
                            in_data = false;
                            writer.write_all(b"250 2.0.0 queued\r\n").unwrap();
                        }
                        continue;
                    }

                    let verb = line.get(..4).unwrap_or_default().to_ascii_uppercase();
                    let reply = match verb.as_str() {
                        "EHLO" => ehlo,
                        "MAIL" | "NOOP" | "RSET" => "250 ok\r\n",
                        "RCPT" => rcpt(&line),
                        "AUTH" => "235 2.7.0 accepted\r\n",
                        "DATA" => {
                            in_data = true;
                            "354 go ahead\r\n"
                        }
                        "QUIT" => {
                            writer.write_all(b"221 bye\r\n").unwrap();
                            break;
                        }
                        _ => "502 not implemented\r\n",
                    };
                    writer.write_all(reply.as_bytes()).unwrap();
                }
                received
            });

            TestServer { port, handle }
        }

        fn transport(&self) -> SmtpTransport {
            SmtpTransport::builder_dangerous("127.0.0.1")
                .port(self.port)
                .hello_name(ClientId::Domain("client.example".to_owned()))
                .build()
        }

        fn received(self) -> String {
            self.handle.join().unwrap()
        }
    }

    fn accept_all(_: &str) -> &'static str {
        "250 ok\r\n"
    }

    fn reject_bob(line: &str) -> &'static str {
        if line.contains("bob@") {
            "550 5.1.1 unknown user\r\n"
        } else {
            "250 ok\r\n"
        }
    }

    fn reject_all(_: &str) -> &'static str {
        "550 5.1.1 unknown user\r\n"
    }

    fn envelope(to: &[&str]) -> Envelope {
        Envelope::new(
            Some("sender@example.com".parse().unwrap()),
            to.iter().map(|to| to.parse().unwrap()).collect(),
        )
        .unwrap()
    }

    #[test]
    fn send_raw() {
        let server = TestServer::start("250-test.example\r\n250 8BITMIME\r\n", accept_all);
        let response = server
            .transport()
            .send_raw(
                &envelope(&["alice@example.com"]),
                b"Subject: test\r\n\r\nHello\r\n.leading dot\r\n",
            )
            .unwrap();
        assert_eq!(response.first_line(), Some("2.0.0 queued"));

        assert_eq!(
            server.received(),
            concat!(
                "EHLO client.example\r\n",
                "MAIL FROM:<sender@example.com>\r\n",
                "RCPT TO:<alice@example.com>\r\n",
                "DATA\r\n",
                "Subject: test\r\n",
                "\r\n",
                "Hello\r\n",
                "..leading dot\r\n",
                ".\r\n",
                "QUIT\r\n",
            )
        );
    }

    #[test]
    fn partial_recipients() {
        let server = TestServer::start("250 test.example\r\n", reject_bob);
        let err = server
            .transport()
            .send_raw(
                &envelope(&["alice@example.com", "bob@example.com"]),
                b"Subject: test\r\n\r\nHello\r\n",
            )
            .unwrap_err();

        assert!(err.is_recipients());
        assert!(!err.is_fatal());
        assert_eq!(err.failed_recipients().len(), 1);
        assert_eq!(
            err.failed_recipients()[0].address().to_string(),
            "bob@example.com"
        );

        let received = server.received();
        assert!(received.contains("DATA\r\n"));
        assert!(received.ends_with("QUIT\r\n"));
    }

    #[test]
    fn all_recipients_rejected() {
        let server = TestServer::start("250 test.example\r\n", reject_all);
        let err = server
            .transport()
            .send_raw(
                &envelope(&["alice@example.com", "bob@example.com"]),
                b"Subject: test\r\n\r\nHello\r\n",
            )
            .unwrap_err();

        assert!(err.is_recipients());
        assert!(err.is_fatal());
        assert_eq!(err.failed_recipients().len(), 2);

        let received = server.received();
        assert!(!received.contains("DATA"));
        assert!(!received.contains("QUIT"));
    }

    #[test]
    fn authentication() {
        let server =
            TestServer::start("250-test.example\r\n250 AUTH PLAIN LOGIN\r\n", accept_all);
        let transport = SmtpTransport::builder_dangerous("127.0.0.1")
            .port(server.port)
            .credentials(Credentials::new("alice".to_owned(), "secret".to_owned()))
            .build();
        transport
            .send_raw(&envelope(&["bob@example.com"]), b"Hello\r\n")
            .unwrap();

        // "\0alice\0secret"
        assert!(server
            .received()
            .contains("AUTH PLAIN AGFsaWNlAHNlY3JldA==\r\n"));
    }

    #[test]
    fn helo_fallback() {
        let server = TestServer::start("500 what\r\n", accept_all);
        // the server answers 502 to HELO too, the session fails
        let err = server
            .transport()
            .send_raw(&envelope(&["bob@example.com"]), b"Hello\r\n")
            .unwrap_err();
        assert!(err.is_permanent());
        assert!(server.received().contains("HELO client.example\r\n"));
    }

    #[test]
    fn test_connection() {
        let server = TestServer::start("250 test.example\r\n", accept_all);
        assert!(server.transport().test_connection().unwrap());
        assert!(server.received().ends_with("NOOP\r\nQUIT\r\n"));
    }

    #[test]
    #[cfg(feature = "builder")]
    fn send_message() {
        use relaymail::{message::header::ContentType, Message};

        let server = TestServer::start("250-test.example\r\n250 8BITMIME\r\n", accept_all);
        let email = Message::builder()
            .from("NoBody <nobody@example.com>".parse().unwrap())
            .to("Hei <hei@example.com>".parse().unwrap())
            .subject("Happy new year")
            .header(ContentType::TEXT_PLAIN)
            .body(String::from("Be happy!\r\n.\r\n"))
            .unwrap();
        server.transport().send(&email).unwrap();

        let received = server.received();
        assert!(received.starts_with(
            "EHLO client.example\r\nMAIL FROM:<nobody@example.com>\r\nRCPT TO:<hei@example.com>\r\nDATA\r\n"
        ));
        assert!(received.contains("Subject: Happy new year\r\n"));
        assert!(received.contains("Be happy!\r\n..\r\n"));
        assert!(received.ends_with("\r\n.\r\nQUIT\r\n"));
    }
}
