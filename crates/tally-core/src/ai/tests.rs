use rust_decimal::Decimal;

use super::*;
use crate::currency::CurrencyConverter;
use crate::models::Currency;
use crate::test_utils::{MockOpenAIServer, MockReply};
use crate::tools::{ToolBox, FORMAT_DATETIME};

const COFFEE_JSON: &str = r#"{"category": "Food & Dining", "total_amount": "5.50", "currency": "USD",
    "confidence": 0.95, "cost": 0.5, "comments": "Coffee shop"}"#;

fn openai(server: &MockOpenAIServer) -> OpenAIBackend {
    OpenAIBackend::with_base_url(
        &server.base_url(),
        Some("test-key".to_string()),
        openai::DEFAULT_OPENAI_MODEL,
    )
}

fn offline_tools() -> ToolBox {
    ToolBox::new(CurrencyConverter::new(None))
}

#[tokio::test]
async fn test_openai_structured_output() {
    let server = MockOpenAIServer::with_replies(vec![MockReply::Content(format!(
        "```json\n{}\n```",
        COFFEE_JSON
    ))])
    .await;
    let backend = openai(&server);

    let response = backend
        .completion(&[ChatMessage::system("classify"), ChatMessage::user("Coffee")])
        .await
        .unwrap()
        .into_categorization()
        .unwrap();

    assert_eq!(response.category, "Food & Dining");
    assert_eq!(response.total_amount, Decimal::new(550, 2));
    assert_eq!(response.currency, Currency::Usd);
    // Model-reported cost is replaced: 1000 prompt + 500 completion tokens on nano
    assert_eq!(response.cost, Decimal::new(3, 4));

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request["model"], "gpt-4.1-nano-2025-04-14");
    assert_eq!(request["max_tokens"], 500);
    assert_eq!(request["top_p"], 1.0);
    assert_eq!(request["response_format"]["type"], "json_object");
    assert!(request.get("tools").is_none());
    assert_eq!(request["messages"][0]["role"], "system");
    assert_eq!(request["messages"][1]["content"], "Coffee");
}

#[tokio::test]
async fn test_openai_tool_call_round_trip() {
    let server = MockOpenAIServer::with_replies(vec![
        MockReply::ToolCalls(vec![(
            FORMAT_DATETIME.to_string(),
            r#"{"dt": "2024-01-15T10:30:00Z"}"#.to_string(),
        )]),
        MockReply::Content("That was 15/01/2024 11:30 in Madrid".to_string()),
    ])
    .await;
    let backend = openai(&server).with_tools(offline_tools());

    let reply = backend
        .completion(&[ChatMessage::user("When was this?")])
        .await
        .unwrap();
    assert_eq!(
        reply,
        AssistantReply::Text("That was 15/01/2024 11:30 in Madrid".to_string())
    );

    let requests = server.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0]["tools"].as_array().unwrap().len(), 2);

    let follow_up = requests[1]["messages"].as_array().unwrap();
    assert_eq!(follow_up.len(), 3);
    assert_eq!(follow_up[1]["role"], "assistant");
    assert_eq!(follow_up[1]["tool_calls"][0]["function"]["name"], FORMAT_DATETIME);
    assert_eq!(follow_up[2]["role"], "tool");
    assert_eq!(follow_up[2]["tool_call_id"], "call_0");
    assert_eq!(follow_up[2]["content"], "15/01/2024 11:30");
    assert!(requests[1].get("tools").is_none());
}

#[tokio::test]
async fn test_openai_tool_error_fed_back() {
    let server = MockOpenAIServer::with_replies(vec![
        MockReply::ToolCalls(vec![(
            "convert_currency".to_string(),
            r#"{"amount": "10", "from_currency": "USD", "to_currency": "EUR"}"#.to_string(),
        )]),
        MockReply::Content("Conversion unavailable".to_string()),
    ])
    .await;
    let backend = openai(&server).with_tools(offline_tools());

    let reply = backend.completion(&[ChatMessage::user("10 USD")]).await.unwrap();
    assert_eq!(reply, AssistantReply::Text("Conversion unavailable".to_string()));

    let requests = server.requests();
    let tool_message = &requests[1]["messages"][2];
    assert!(tool_message["content"]
        .as_str()
        .unwrap()
        .starts_with("Error:"));
}

#[tokio::test]
async fn test_openai_tool_calls_without_toolbox() {
    let server = MockOpenAIServer::with_replies(vec![MockReply::ToolCalls(vec![(
        FORMAT_DATETIME.to_string(),
        "{}".to_string(),
    )])])
    .await;

    let err = openai(&server)
        .completion(&[ChatMessage::user("hi")])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
}

#[tokio::test]
async fn test_openai_malformed_output_is_upstream_error() {
    let server = MockOpenAIServer::with_replies(vec![
        MockReply::Content("I think it is food, about five dollars".to_string()),
        MockReply::Content(r#"{"category": "Food"#.to_string()),
    ])
    .await;
    let backend = openai(&server);

    let err = backend.completion(&[ChatMessage::user("x")]).await.unwrap_err();
    assert!(err.to_string().contains("No valid JSON found"));

    let err = backend.completion(&[ChatMessage::user("x")]).await.unwrap_err();
    assert!(matches!(err, Error::Upstream(_)));
}

#[tokio::test]
async fn test_openai_http_error() {
    let server =
        MockOpenAIServer::with_replies(vec![MockReply::Error(429, "rate limited".to_string())])
            .await;

    let err = openai(&server)
        .completion(&[ChatMessage::user("x")])
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("429"));
    assert!(message.contains("rate limited"));
}

#[tokio::test]
async fn test_openai_text_mode() {
    let server =
        MockOpenAIServer::with_replies(vec![MockReply::Content("plain answer".to_string())]).await;
    let backend = openai(&server).without_structured_output();

    let reply = backend.completion(&[ChatMessage::user("x")]).await.unwrap();
    assert_eq!(reply, AssistantReply::Text("plain answer".to_string()));
    assert!(server.requests()[0].get("response_format").is_none());
}

#[tokio::test]
async fn test_default_server_reply_uses_keywords() {
    let server = MockOpenAIServer::start().await;
    let backend = openai(&server);

    let response = backend
        .completion(&[ChatMessage::user("Uber ride 20 USD")])
        .await
        .unwrap()
        .into_categorization()
        .unwrap();
    assert_eq!(response.category, "Transportation");
    assert_eq!(response.total_amount, Decimal::new(20, 0));
    assert_eq!(response.currency, Currency::Usd);
}

#[tokio::test]
async fn test_groq_cost_is_zero() {
    let server = MockOpenAIServer::with_replies(vec![MockReply::Content(COFFEE_JSON.to_string())])
        .await;
    let backend =
        GroqBackend::with_base_url(&server.base_url(), "groq-key", "llama-3.1-8b-instant");

    let response = backend
        .completion(&[ChatMessage::user("Coffee")])
        .await
        .unwrap()
        .into_categorization()
        .unwrap();
    assert_eq!(response.cost, Decimal::ZERO);
    assert_eq!(backend.calculate_cost(1_000_000, 1_000_000), Decimal::ZERO);
    assert_eq!(backend.provider(), "groq");
}

#[tokio::test]
async fn test_get_available_models() {
    let server = MockOpenAIServer::start().await;

    let models = openai(&server).get_available_models().await.unwrap();
    assert_eq!(
        models,
        vec!["gpt-4.1-nano-2025-04-14", "gpt-4.1-mini-2025-04-14"]
    );

    let groq = GroqBackend::with_base_url(&server.base_url(), "k", "m");
    assert_eq!(groq.get_available_models().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_client_dispatch() {
    let server = MockOpenAIServer::start().await;
    let client = LlmClient::OpenAI(openai(&server));
    assert_eq!(client.provider(), "openai");
    assert_eq!(client.model(), "gpt-4.1-nano-2025-04-14");
    assert_eq!(client.calculate_cost(1000, 500), Decimal::new(3, 4));

    let mock = LlmClient::mock();
    assert_eq!(mock.provider(), "mock");
    let response = mock
        .completion(&[ChatMessage::user("Hotel in Paris 120 EUR")])
        .await
        .unwrap()
        .into_categorization()
        .unwrap();
    assert_eq!(response.category, "Travel");
}
