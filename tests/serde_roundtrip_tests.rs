use anyhow::Result as AnyResult;
use serde_json::json;
use webagent::{
    ActionFeedback, BoundingBox, BrowserHealth, DecisionAction, DynamicData, ErrorCode,
    FailurePolicy, KeyElement, TaskGoal, UtcTimestamp, WebObservation,
};

#[test]
fn task_goal_survives_a_round_trip() -> AnyResult<()> {
    let goal = TaskGoal::new("4d1f", "S002", "Download the monthly invoice")
        .with_allowed_actions(["click", "download_link"])
        .with_deadline(UtcTimestamp::parse("2026-03-01T12:00:00Z")?)
        .with_required_data(DynamicData::from([("username", "alice"), ("month", "2026-02")]))
        .with_priority(2);

    let text = serde_json::to_string(&goal)?;
    let back: TaskGoal = serde_json::from_str(&text)?;
    assert_eq!(back, goal);
    Ok(())
}

#[test]
fn omitted_goal_fields_take_defaults() -> AnyResult<()> {
    let goal: TaskGoal = serde_json::from_value(json!({
        "task_uuid": "4d1f",
        "step_id": "S001",
        "target_description": "Open the invoices page"
    }))?;
    assert_eq!(goal.max_execution_time_seconds, 60);
    assert_eq!(goal.priority_level, 5);
    assert_eq!(goal.current_agent_persona, "standard_user");
    assert_eq!(goal.execution_environment, "desktop_chrome");
    assert_eq!(goal.allowed_actions, vec!["click", "type", "scroll", "extract", "wait"]);
    assert!(goal.task_deadline_utc.is_none());
    assert!(goal.required_data.is_none());
    Ok(())
}

#[test]
fn observation_keeps_key_element_order() -> AnyResult<()> {
    let elements: Vec<KeyElement> = ["z-last", "a-first", "m-middle"]
        .into_iter()
        .enumerate()
        .map(|(index, id)| {
            let top = index as f64 * 40.0;
            let bbox = BoundingBox::new(0.0, top, 100.0, top + 30.0);
            KeyElement::new(id, "button", format!("//button[{}]", index + 1), bbox)
                .with_text(id.to_uppercase())
                .clickable(true)
                .visible(index != 2)
        })
        .collect();
    let observation = WebObservation::builder("https://shop.example/invoices")
        .timestamp(UtcTimestamp::parse("2026-02-10T08:30:00.250Z")?)
        .page_load_time_ms(812)
        .authenticated(true)
        .elements(elements)
        .feedback(Some(ActionFeedback::failed("401", "session expired")))
        .memory_context("#1 click -> FAILED")
        .health(BrowserHealth::Degraded)
        .build();

    let text = serde_json::to_string(&observation)?;
    let back: WebObservation = serde_json::from_str(&text)?;
    assert_eq!(back, observation);
    let ids: Vec<_> = back.key_elements.iter().map(|e| e.element_id.as_str()).collect();
    assert_eq!(ids, vec!["z-last", "a-first", "m-middle"]);
    assert_eq!(
        back.last_action_feedback.as_ref().map(|f| f.error_code.clone()),
        Some(ErrorCode::Http(401))
    );
    Ok(())
}

#[test]
fn decision_action_round_trip_and_policy_alias() -> AnyResult<()> {
    let action = DecisionAction::new("click", 0.85)
        .with_arg("xpath", "//a[text()='Invoices']")
        .with_max_attempts(3)
        .with_timeout_secs(20)
        .with_wait_for("network_idle")
        .with_reasoning("link is visible in the sidebar")
        .with_expected_outcome("invoice list loads")
        .with_failure_policy(FailurePolicy::Escalate);
    let back: DecisionAction = serde_json::from_str(&serde_json::to_string(&action)?)?;
    assert_eq!(back, action);

    let raw: DecisionAction = serde_json::from_value(json!({
        "tool_name": "click",
        "tool_args": {"xpath": "//button", "index": 2, "force": true},
        "confidence_score": 0.5,
        "on_failure_action": "STOP_TASK"
    }))?;
    assert_eq!(raw.on_failure_action, FailurePolicy::Abort);
    assert_eq!(raw.max_attempts, 1);
    assert_eq!(raw.execution_timeout_seconds, 10);
    assert_eq!(raw.tool_args.get("index"), Some("2"));
    assert_eq!(raw.tool_args.get("force"), Some("true"));

    let unknown: DecisionAction = serde_json::from_value(json!({
        "tool_name": "click",
        "confidence_score": 0.5,
        "on_failure_action": "ASK_HUMAN"
    }))?;
    assert_eq!(unknown.on_failure_action, FailurePolicy::Other("ASK_HUMAN".into()));
    assert_eq!(serde_json::to_value(&unknown)?["on_failure_action"], "ASK_HUMAN");
    Ok(())
}

#[test]
fn non_utc_timestamps_are_rejected() {
    assert!(UtcTimestamp::parse("2026-02-10T08:30:00+02:00").is_err());
    assert!(UtcTimestamp::parse("2026-02-10T08:30:00+00:00").is_ok());
    assert!(UtcTimestamp::parse("2026-02-10T08:30:00").is_ok());
}
