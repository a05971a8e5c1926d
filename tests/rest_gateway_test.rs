use dashboard::gateway::{AuthClient, DashboardGateway, GatewayConfig, RestGateway};

/// Needs GATEWAY_URL, GATEWAY_ANON_KEY and TEST_ACCESS_TOKEN for a real learner.
#[tokio::test]
#[ignore]
async fn test_rest_gateway_reads_live_tables() {
    dotenvy::dotenv().ok();

    let config = GatewayConfig::new_from_env().expect("gateway config");
    let token = std::env::var("TEST_ACCESS_TOKEN").expect("TEST_ACCESS_TOKEN not set");
    let gateway = RestGateway::new(config).expect("Failed to build client");

    let session = gateway.resolve_session(&token).await.expect("Failed to resolve session");
    println!("Signed in as {} ({:?})", session.user_id, session.email);

    let courses = gateway.fetch_courses(&session).await.expect("Failed to fetch courses");
    let modules = gateway.fetch_modules(&session).await.expect("Failed to fetch modules");
    let completions = gateway.fetch_completions(&session).await.expect("Failed to fetch completions");
    println!("{} courses, {} modules, {} completions", courses.len(), modules.len(), completions.len());

    assert!(modules.windows(2).all(|w| w[0].order_index <= w[1].order_index));
    assert!(completions.iter().all(|c| c.user_id == session.user_id));

    let profile = gateway.fetch_profile(&session).await.expect("Failed to fetch profile");
    if let Some(profile) = profile {
        assert_eq!(profile.id, session.user_id);
    }
}

#[tokio::test]
#[ignore]
async fn test_rest_gateway_rejects_bad_token() {
    dotenvy::dotenv().ok();

    let config = GatewayConfig::new_from_env().expect("gateway config");
    let gateway = RestGateway::new(config).expect("Failed to build client");

    let result = gateway.resolve_session("not-a-real-token").await;
    assert!(matches!(result, Err(dashboard::error::AppError::AuthRequired)));
}
