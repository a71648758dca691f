//! End-to-end tests of the connector against a mocked webservice.

use otrs::connector::{
    GenericTicketConnector, TicketChanges, TicketGetOptions, TicketRef, TicketSearch, TicketSelector,
};
use otrs::error::OtrsError;
use otrs::models::{Article, Attachment, DynamicField, FieldValue, Ticket};
use pretty_assertions::assert_eq;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT_PATH: &str = "/otrs/nph-genericinterface.pl/Webservice/GenericTicketConnector";
const SESSION_ID: &str = "0d2e3c6bd4a1fdd3a62b1a6e0b3e9e8a";

fn envelope(inner: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/" soap:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/"><soap:Body>{}</soap:Body></soap:Envelope>"#,
        inner
    )
}

fn soap_ok(inner: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/xml; charset=UTF-8")
        .set_body_string(envelope(inner))
}

async fn connector_for(server: &MockServer) -> GenericTicketConnector {
    let mut connector = GenericTicketConnector::new(&server.uri(), "GenericTicketConnector").unwrap();
    connector.register_credentials("agent", "agent-password");
    connector
}

#[tokio::test]
async fn session_create_stores_session_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(ENDPOINT_PATH))
        .and(header("content-type", "text/xml; charset=utf-8"))
        .and(body_string_contains("<tic:SessionCreate><UserLogin>agent</UserLogin><Password>agent-password</Password></tic:SessionCreate>"))
        .respond_with(soap_ok(&format!(
            "<SessionCreateResponse><SessionID>{}</SessionID></SessionCreateResponse>",
            SESSION_ID
        )))
        .expect(1)
        .mount(&server)
        .await;

    let mut connector = GenericTicketConnector::new(&server.uri(), "GenericTicketConnector").unwrap();
    let session_id = connector.session_create("agent", "agent-password").await.unwrap();

    assert_eq!(session_id.len(), 32);
    assert_eq!(connector.session_id().as_deref(), Some(SESSION_ID));
}

#[tokio::test]
async fn session_create_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(soap_ok(
            "<SessionCreateResponse><Error><ErrorCode>SessionCreate.AuthFail</ErrorCode>\
             <ErrorMessage>SessionCreate: Authorization failing!</ErrorMessage></Error></SessionCreateResponse>",
        ))
        .mount(&server)
        .await;

    let mut connector = GenericTicketConnector::new(&server.uri(), "GenericTicketConnector").unwrap();
    let err = connector.session_create("agent", "wrong").await.unwrap_err();

    assert!(err.is_auth_failure());
    assert!(connector.session_id().is_none());
}

#[tokio::test]
async fn ticket_get_uses_session_and_coerces_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains(&format!("<SessionID>{}</SessionID>", SESSION_ID)))
        .and(body_string_contains("<TicketID>32</TicketID>"))
        .respond_with(soap_ok(
            "<TicketGetResponse><Ticket>\
               <TicketID>32</TicketID><TicketNumber>515422152827</TicketNumber>\
               <Title>Foofoo my title</Title><StateType>closed</StateType>\
               <CustomerUserID>foo@bar.tld</CustomerUserID><SLAID/>\
             </Ticket></TicketGetResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut connector = connector_for(&server).await;
    connector.set_session_id(SESSION_ID);
    let ticket = connector.ticket_get(32, TicketGetOptions::default()).await.unwrap();

    assert_eq!(ticket.ticket_id, Some(32));
    assert_eq!(ticket.state_type.as_deref(), Some("closed"));
    assert_eq!(ticket.customer_user_id.as_deref(), Some("foo@bar.tld"));
    assert_eq!(ticket.sla_id, None);
}

#[tokio::test]
async fn ticket_get_with_articles_and_attachments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<AllArticles>1</AllArticles>"))
        .and(body_string_contains("<Attachments>1</Attachments>"))
        .respond_with(soap_ok(
            "<TicketGetResponse><Ticket><TicketID>32</TicketID>\
               <Article><ArticleID>118</ArticleID><Subject>UnitTest</Subject><Body>bla</Body>\
                 <Attachment><Content>aGVsbG8=</Content><ContentType>text/plain</ContentType>\
                 <Filename>hello.txt</Filename><FilesizeRaw>5</FilesizeRaw></Attachment>\
               </Article>\
             </Ticket></TicketGetResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let ticket = connector
        .ticket_get(32, TicketGetOptions::default().with_attachments())
        .await
        .unwrap();

    let article = &ticket.articles[0];
    assert_eq!(article.article_id, Some(118));
    assert_eq!(article.attachments[0].filesize_raw, Some(5));
    assert_eq!(article.attachments[0].decoded_content().unwrap(), b"hello");
}

#[tokio::test]
async fn ticket_get_many_joins_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<TicketID>1,2</TicketID>"))
        .respond_with(soap_ok(
            "<TicketGetResponse><Ticket><TicketID>1</TicketID></Ticket>\
             <Ticket><TicketID>2</TicketID></Ticket></TicketGetResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let tickets = connector
        .ticket_get_many(&[1, 2], TicketGetOptions::default())
        .await
        .unwrap();

    let ids: Vec<_> = tickets.iter().map(|t| t.ticket_id).collect();
    assert_eq!(ids, vec![Some(1), Some(2)]);
}

#[tokio::test]
async fn ticket_get_access_denied() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(soap_ok(
            "<TicketGetResponse><Error><ErrorCode>TicketGet.AccessDenied</ErrorCode>\
             <ErrorMessage>TicketGet: User does not have access to the ticket!</ErrorMessage></Error></TicketGetResponse>",
        ))
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let err = connector.ticket_get(99, TicketGetOptions::default()).await.unwrap_err();

    match err {
        OtrsError::Remote { code, .. } => assert_eq!(code, "TicketGet.AccessDenied"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn ticket_search_returns_ids() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<UserLogin>agent</UserLogin>"))
        .and(body_string_contains("<CustomerID>9</CustomerID>"))
        .respond_with(soap_ok(
            "<TicketSearchResponse><TicketID>32</TicketID><TicketID>31</TicketID></TicketSearchResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let ids = connector
        .ticket_search(&TicketSearch::new().with_customer_id("9"))
        .await
        .unwrap();

    assert_eq!(ids, vec![32, 31]);
    assert!(ids.contains(&32));
}

#[tokio::test]
async fn ticket_search_no_results() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(soap_ok("<TicketSearchResponse/>"))
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let ids = connector.ticket_search(&TicketSearch::new()).await.unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn ticket_create_sends_objects() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains(
            "<Ticket><CustomerUser>foo@exemple.fr</CustomerUser><Priority>3 normal</Priority>\
             <Queue>Support</Queue><State>new</State><Title>Problem test</Title><Type>Divers</Type></Ticket>",
        ))
        .and(body_string_contains(
            "<Article><Subject>UnitTest</Subject><Body>bla</Body><Charset>UTF8</Charset><MimeType>text/plain</MimeType></Article>",
        ))
        .and(body_string_contains("<DynamicField><Name>Impact</Name><Value>low</Value></DynamicField>"))
        .and(body_string_contains("<Attachment><Content>aGk=</Content>"))
        .respond_with(soap_ok(
            "<TicketCreateResponse><ArticleID>201</ArticleID><TicketID>57</TicketID>\
             <TicketNumber>2014051610000057</TicketNumber></TicketCreateResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let ticket = Ticket::new()
        .with_state("new")
        .with_priority("3 normal")
        .with_queue("Support")
        .with_title("Problem test")
        .with_customer_user("foo@exemple.fr")
        .with_type("Divers");
    let article = Article::new("UnitTest", "bla").with_charset("UTF8");

    let created = connector
        .ticket_create(
            &ticket,
            &article,
            &[DynamicField::new("Impact", "low")],
            &[Attachment::from_bytes("hi.txt", "text/plain", b"hi")],
        )
        .await
        .unwrap();

    assert_eq!(
        created,
        TicketRef {
            ticket_id: 57,
            ticket_number: "2014051610000057".to_string(),
            article_id: Some(201),
        }
    );
    assert!(created.ticket_number.len() >= 12);
}

#[tokio::test]
async fn ticket_update_by_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<tic:TicketUpdate>"))
        .and(body_string_contains("<TicketID>57</TicketID><Ticket><Title>Foubar</Title></Ticket>"))
        .respond_with(soap_ok(
            "<TicketUpdateResponse><TicketID>57</TicketID><TicketNumber>2014051610000057</TicketNumber></TicketUpdateResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let updated = connector
        .ticket_update(
            TicketSelector::Id(57),
            &TicketChanges::new().with_ticket(Ticket::new().with_title("Foubar")),
        )
        .await
        .unwrap();

    assert_eq!(updated.ticket_id, 57);
    assert_eq!(updated.ticket_number, "2014051610000057");
    assert_eq!(updated.article_id, None);
}

#[tokio::test]
async fn ticket_update_by_number_with_article() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<TicketNumber>2014051610000057</TicketNumber>"))
        .and(body_string_contains("<Article><Subject>Follow-up</Subject>"))
        .respond_with(soap_ok(
            "<TicketUpdateResponse><ArticleID>202</ArticleID><TicketID>57</TicketID>\
             <TicketNumber>2014051610000057</TicketNumber></TicketUpdateResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let updated = connector
        .ticket_update(
            TicketSelector::Number("2014051610000057".to_string()),
            &TicketChanges::new().with_article(Article::new("Follow-up", "Still broken")),
        )
        .await
        .unwrap();

    assert_eq!(updated.ticket_id, 57);
    assert_eq!(updated.article_id, Some(202));
}

#[tokio::test]
async fn ticket_update_rejects_empty_changes_without_calling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(soap_ok("<TicketUpdateResponse/>"))
        .expect(0)
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let err = connector
        .ticket_update(TicketSelector::Id(1), &TicketChanges::new())
        .await
        .unwrap_err();

    assert!(matches!(err, OtrsError::Validation(_)));
}

#[tokio::test]
async fn unauthenticated_calls_fail_without_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(soap_ok("<TicketSearchResponse/>"))
        .expect(0)
        .mount(&server)
        .await;

    let connector = GenericTicketConnector::new(&server.uri(), "GenericTicketConnector").unwrap();
    let err = connector.ticket_search(&TicketSearch::new()).await.unwrap_err();

    assert!(matches!(err, OtrsError::NotAuthenticated));
}

#[tokio::test]
async fn soap_fault_on_http_500() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string(envelope(
            "<soap:Fault><faultcode>Server</faultcode><faultstring>Operation TicketFoo unknown</faultstring></soap:Fault>",
        )))
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let err = connector.ticket_search(&TicketSearch::new()).await.unwrap_err();

    assert!(matches!(err, OtrsError::SoapFault { ref code, .. } if code == "Server"));
}

#[tokio::test]
async fn http_error_body_is_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("proxy echoed agent-password"))
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let err = connector.ticket_search(&TicketSearch::new()).await.unwrap_err();

    match err {
        OtrsError::HttpStatus { status, body } => {
            assert_eq!(status.as_u16(), 502);
            assert_eq!(body, "proxy echoed [REDACTED]");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn http_401_is_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let err = connector.ticket_search(&TicketSearch::new()).await.unwrap_err();
    assert!(matches!(err, OtrsError::Authentication));
}

#[tokio::test]
async fn malformed_response_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>maintenance</body></html>"))
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let err = connector.ticket_search(&TicketSearch::new()).await.unwrap_err();
    assert!(matches!(err, OtrsError::MalformedResponse(_)));
}

#[tokio::test]
async fn customer_session_create_logs_in_as_customer_user() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains(
            "<tic:SessionCreate><CustomerUserLogin>foo@bar.tld</CustomerUserLogin><Password>customer-password</Password></tic:SessionCreate>",
        ))
        .respond_with(soap_ok(&format!(
            "<SessionCreateResponse><SessionID>{}</SessionID></SessionCreateResponse>",
            SESSION_ID
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains(&format!(
            "<tic:TicketSearch><SessionID>{}</SessionID>",
            SESSION_ID
        )))
        .respond_with(soap_ok("<TicketSearchResponse><TicketID>32</TicketID></TicketSearchResponse>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut connector = GenericTicketConnector::new(&server.uri(), "GenericTicketConnector").unwrap();
    let session_id = connector
        .customer_session_create("foo@bar.tld", "customer-password")
        .await
        .unwrap();
    assert_eq!(session_id, SESSION_ID);

    let ids = connector.ticket_search(&TicketSearch::new()).await.unwrap();
    assert_eq!(ids, vec![32]);
}

#[tokio::test]
async fn customer_credentials_are_sent_per_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains(
            "<CustomerUserLogin>foo@bar.tld</CustomerUserLogin><Password>customer-password</Password>",
        ))
        .respond_with(soap_ok("<TicketSearchResponse/>"))
        .expect(1)
        .mount(&server)
        .await;

    let mut connector = GenericTicketConnector::new(&server.uri(), "GenericTicketConnector").unwrap();
    connector.register_customer_credentials("foo@bar.tld", "customer-password");
    let ids = connector.ticket_search(&TicketSearch::new()).await.unwrap();
    assert!(ids.is_empty());
}

#[tokio::test]
async fn ticket_get_with_dynamic_fields() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<TicketID>32</TicketID><DynamicFields>1</DynamicFields></tic:TicketGet>"))
        .respond_with(soap_ok(
            "<TicketGetResponse><Ticket><TicketID>32</TicketID><CustomerID>9</CustomerID>\
               <DynamicField><Name>Impact</Name><Value>high</Value></DynamicField>\
               <DynamicField><Name>Tags</Name><Value>a</Value><Value/></DynamicField>\
             </Ticket></TicketGetResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let ticket = connector
        .ticket_get(32, TicketGetOptions::default().with_dynamic_fields())
        .await
        .unwrap();

    assert_eq!(ticket.dynamic_field("Impact").and_then(|f| f.value()), Some("high"));
    assert_eq!(ticket.dynamic_field("Tags").map(|f| f.values.clone()), Some(vec!["a".to_string(), String::new()]));
    assert_eq!(ticket.get("CustomerID"), Some(FieldValue::Integer(9)));
    assert!(ticket.articles.is_empty());
}

#[tokio::test]
async fn ticket_update_sends_attachments_next_to_article() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains("<TicketID>57</TicketID><Article><Subject>Logs</Subject>"))
        .and(body_string_contains(
            "</Article><Attachment><Content>aGk=</Content><ContentType>text/plain</ContentType><Filename>hi.txt</Filename>",
        ))
        .respond_with(soap_ok(
            "<TicketUpdateResponse><ArticleID>203</ArticleID><TicketID>57</TicketID>\
             <TicketNumber>2014051610000057</TicketNumber></TicketUpdateResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let updated = connector
        .ticket_update(
            TicketSelector::Id(57),
            &TicketChanges::new()
                .with_article(Article::new("Logs", "See attached"))
                .with_attachment(Attachment::from_bytes("hi.txt", "text/plain", b"hi")),
        )
        .await
        .unwrap();

    assert_eq!(updated.article_id, Some(203));
}

#[tokio::test]
async fn ticket_update_rejects_attachments_without_article() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(soap_ok("<TicketUpdateResponse/>"))
        .expect(0)
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let err = connector
        .ticket_update(
            TicketSelector::Id(57),
            &TicketChanges::new()
                .with_ticket(Ticket::new().with_state("open"))
                .with_attachment(Attachment::from_bytes("hi.txt", "text/plain", b"hi")),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, OtrsError::Validation(_)));
}

#[tokio::test]
async fn expired_session_falls_back_to_credentials() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_string_contains(&format!("<SessionID>{}</SessionID>", SESSION_ID)))
        .respond_with(soap_ok(
            "<TicketSearchResponse><Error><ErrorCode>TicketSearch.AuthFail</ErrorCode>\
             <ErrorMessage>TicketSearch: Authorization failing!</ErrorMessage></Error></TicketSearchResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_string_contains("<UserLogin>agent</UserLogin><Password>agent-password</Password>"))
        .respond_with(soap_ok("<TicketSearchResponse><TicketID>32</TicketID></TicketSearchResponse>"))
        .expect(2)
        .mount(&server)
        .await;

    let mut connector = connector_for(&server).await;
    connector.set_session_id(SESSION_ID);

    let ids = connector.ticket_search(&TicketSearch::new()).await.unwrap();
    assert_eq!(ids, vec![32]);
    assert!(connector.session_id().is_none());

    // The stale session is gone, so this goes straight to the credentials.
    let ids = connector.ticket_search(&TicketSearch::new()).await.unwrap();
    assert_eq!(ids, vec![32]);
}

#[tokio::test]
async fn rejected_session_without_credentials_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(soap_ok(
            "<TicketGetResponse><Error><ErrorCode>TicketGet.AuthFail</ErrorCode>\
             <ErrorMessage>TicketGet: Authorization failing!</ErrorMessage></Error></TicketGetResponse>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let mut connector = GenericTicketConnector::new(&server.uri(), "GenericTicketConnector").unwrap();
    connector.set_session_id(SESSION_ID);
    let err = connector.ticket_get(32, TicketGetOptions::default()).await.unwrap_err();

    assert!(err.is_auth_failure());
    assert_eq!(connector.session_id().as_deref(), Some(SESSION_ID));
}

#[tokio::test]
async fn remote_error_message_is_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(soap_ok(
            "<TicketSearchResponse><Error><ErrorCode>TicketSearch.AuthFail</ErrorCode>\
             <ErrorMessage>Login agent with agent-password refused</ErrorMessage></Error></TicketSearchResponse>",
        ))
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let err = connector.ticket_search(&TicketSearch::new()).await.unwrap_err();

    match err {
        OtrsError::Remote { code, message } => {
            assert_eq!(code, "TicketSearch.AuthFail");
            assert_eq!(message, "Login agent with [REDACTED] refused");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn soap_fault_message_is_sanitized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string(envelope(
            "<soap:Fault><faultcode>Client</faultcode><faultstring>cannot parse agent-password</faultstring></soap:Fault>",
        )))
        .mount(&server)
        .await;

    let connector = connector_for(&server).await;
    let err = connector.ticket_search(&TicketSearch::new()).await.unwrap_err();

    assert!(!err.to_string().contains("agent-password"));
    assert!(matches!(err, OtrsError::SoapFault { ref message, .. } if message == "cannot parse [REDACTED]"));
}
