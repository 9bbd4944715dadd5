use deskpilot_governance::{
    setup_metrics_recorder, track_command, track_request, track_step, CommandOutcomeLabel,
};

#[test]
fn test_metrics_render_after_tracking() {
    let handle = setup_metrics_recorder().expect("recorder installs once per process");

    track_command("find_and_join_channel", CommandOutcomeLabel::Success, 0.42);
    track_command("general", CommandOutcomeLabel::Cancelled, 0.01);
    track_step("messaging", "join_channel", "verified");
    track_request("POST", "/v1/commands", 200, 0.05);

    let rendered = handle.render();
    assert!(rendered.contains("deskpilot_commands_total"));
    assert!(rendered.contains("workflow=\"find_and_join_channel\""));
    assert!(rendered.contains("outcome=\"cancelled\""));
    assert!(rendered.contains("deskpilot_steps_total"));
    assert!(rendered.contains("http_requests_total"));

    // A second global recorder is refused.
    assert!(setup_metrics_recorder().is_err());
}
