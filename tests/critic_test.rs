//! Critic Integration Tests
//!
//! Validator retry bounds and prompt rendering against a scripted backend.

mod common;

use common::{config_for, context, make_runs, ScriptedCompletion};
use skill_memory::{ContentPart, Critic, ResponseValidator, Prompt, ValidatedResponse};
use tempfile::TempDir;

fn critic_with(completion: std::sync::Arc<ScriptedCompletion>, max_retries: u32) -> (Critic, TempDir) {
    let tmp = TempDir::new().unwrap();
    let mut config = config_for(tmp.path());
    config.critic_max_retries = max_retries;
    (Critic::new(&context(config, completion)), tmp)
}

#[tokio::test]
async fn test_fenced_response_accepted() {
    let completion = ScriptedCompletion::always("```json\n{\"success\": true}\n```");
    let validator = ResponseValidator::new(completion.clone());

    let response = validator.invoke(&Prompt::new("sys").with_text("judge"), 5).await;
    assert_eq!(response, ValidatedResponse::new(true, ""));
    assert_eq!(completion.calls(), 1);
}

#[tokio::test]
async fn test_exhausted_retries_fail_closed() {
    let completion = ScriptedCompletion::always("not json");
    let validator = ResponseValidator::new(completion.clone());

    let response = validator.invoke(&Prompt::new("sys").with_text("judge"), 2).await;
    assert_eq!(response, ValidatedResponse::failed());
    assert!(!response.success);
    assert_eq!(response.critique, "");
    assert_eq!(completion.calls(), 2);
}

#[tokio::test]
async fn test_recovers_after_malformed_attempts() {
    let completion = ScriptedCompletion::new(
        &["I think it worked", "{\"success\": \"yes\"}"],
        "{'success': False, 'critique': 'Craft a wooden pickaxe first',}",
    );
    let validator = ResponseValidator::new(completion.clone());

    let response = validator.invoke(&Prompt::new("sys").with_text("judge"), 5).await;
    assert_eq!(
        response,
        ValidatedResponse::new(false, "Craft a wooden pickaxe first")
    );
    assert_eq!(completion.calls(), 3);
}

#[tokio::test]
async fn test_zero_retries_never_calls_backend() {
    let completion = ScriptedCompletion::always("{\"success\": true}");
    let validator = ResponseValidator::new(completion.clone());

    let response = validator.invoke(&Prompt::new("sys").with_text("judge"), 0).await;
    assert_eq!(response, ValidatedResponse::failed());
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_backend_error_consumes_attempt() {
    let completion = ScriptedCompletion::new(&["!error"], "{\"success\": true, \"critique\": \"\"}");
    let validator = ResponseValidator::new(completion.clone());

    let response = validator.invoke(&Prompt::new("sys").with_text("judge"), 2).await;
    assert!(response.success);
    assert_eq!(completion.calls(), 2);

    let failing = ScriptedCompletion::always("!error");
    let validator = ResponseValidator::new(failing.clone());
    assert_eq!(
        validator.invoke(&Prompt::new("sys").with_text("judge"), 3).await,
        ValidatedResponse::failed()
    );
    assert_eq!(failing.calls(), 3);
}

#[tokio::test]
async fn test_missing_observation_skips_backend() {
    let completion = ScriptedCompletion::always("{\"success\": true}");
    let (critic, _tmp) = critic_with(completion.clone(), 5);

    let response = critic.check_task_success("Mine 1 wood log", "", None).await;
    assert_eq!(response, ValidatedResponse::failed());
    assert_eq!(completion.calls(), 0);
}

#[tokio::test]
async fn test_prompt_carries_task_and_context() {
    let completion = ScriptedCompletion::always("{\"success\": true, \"critique\": \"\"}");
    let (critic, _tmp) = critic_with(completion.clone(), 5);

    let response = critic
        .check_task_success("Mine 1 wood log", "", Some("Inventory (1/36): {'oak_log': 1}"))
        .await;
    assert!(response.success);

    let prompt = completion.last_prompt().unwrap();
    let text = prompt.user_text();
    assert!(text.starts_with("Inventory (1/36): {'oak_log': 1}\n\n"));
    assert!(text.contains("Task: Mine 1 wood log\n\n"));
    assert!(text.contains("Context: None"));
    assert_eq!(prompt.image_count(), 0);

    critic
        .check_task_success("Mine 1 wood log", "Use an axe if you have one.", Some(""))
        .await;
    let text = completion.last_prompt().unwrap().user_text();
    assert!(text.starts_with("Task: Mine 1 wood log"));
    assert!(text.contains("Context: Use an axe if you have one."));
}

#[tokio::test]
async fn test_vision_frames_injected() {
    let runs = TempDir::new().unwrap();
    make_runs(runs.path(), &[1, 2, 3], 4);

    let ckpt = TempDir::new().unwrap();
    let mut config = config_for(ckpt.path());
    config.vision.enabled = true;
    config.vision.images_path = Some(runs.path().to_path_buf());
    config.vision.image_count = 2;

    let completion = ScriptedCompletion::always("{\"success\": false, \"critique\": \"Try again\"}");
    let critic = Critic::new(&context(config, completion.clone()));

    let response = critic
        .check_task_success("Craft a table", "", Some("Inventory (0/36): Empty"))
        .await;
    assert_eq!(response, ValidatedResponse::new(false, "Try again"));

    let prompt = completion.last_prompt().unwrap();
    assert_eq!(prompt.image_count(), 2);
    let images: Vec<String> = prompt
        .user
        .iter()
        .filter_map(|part| match part {
            ContentPart::Image(b64) => Some(b64.clone()),
            ContentPart::Text(_) => None,
        })
        .collect();

    use base64::Engine;
    let encode = |s: &str| base64::engine::general_purpose::STANDARD.encode(s);
    assert_eq!(images, vec![encode("2:0"), encode("2:3")]);
}
