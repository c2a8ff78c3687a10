use crate::config::{MirrorBacking, SyncConfig};
use crate::error::SyncError;
use crate::host::{DocId, FailurePlan, Host, MemoryHost, NoticeLevel};
use crate::sync::PairingState;
use crate::text::{TextPosition, TextRange};

use super::{Session, SyncStats};

const SOURCE: &str = "function f() {\n  return 1;\n}\n";

fn pos(line: usize, column: usize) -> TextPosition {
    TextPosition::new(line, column)
}

fn range(a: (usize, usize), b: (usize, usize)) -> TextRange {
    TextRange::new(pos(a.0, a.1), pos(b.0, b.1))
}

fn selection() -> TextRange {
    range((1, 2), (1, 11))
}

fn create_test_session(config: SyncConfig) -> (Session<MemoryHost>, DocId) {
    let mut host = MemoryHost::new();
    let source = host.open_document(SOURCE, Some("JavaScript"));
    (Session::new(host, config), source)
}

/// A session with `"return 1;"` already extracted.
fn create_extracted_session() -> (Session<MemoryHost>, DocId, DocId) {
    let (mut session, source) = create_test_session(SyncConfig::default());
    let mirror = session.extract_now(source, selection(), 0).unwrap();
    session.pump(0);
    (session, source, mirror)
}

fn text(session: &Session<MemoryHost>, doc: DocId) -> String {
    session.host().text(doc).unwrap()
}

fn notices(session: &Session<MemoryHost>, level: NoticeLevel) -> Vec<String> {
    session
        .host()
        .notices()
        .iter()
        .filter(|(l, _)| *l == level)
        .map(|(_, message)| message.clone())
        .collect()
}

// --- Extraction ---

#[test]
fn test_extraction_opens_mirror_with_selected_text() {
    let (session, source, mirror) = create_extracted_session();
    assert_eq!(text(&session, mirror), "return 1;");
    assert!(session.host().is_visible(mirror));
    assert_eq!(session.host().language_hint(mirror).as_deref(), Some("JavaScript"));

    let pairing = session.pairing(source).unwrap();
    assert_eq!(pairing.state(), PairingState::Active);
    assert_eq!(pairing.tracked_range(), selection());
    assert_eq!(session.host().highlight(source), Some(selection()));
}

#[test]
fn test_extraction_backs_mirror_with_temp_resource() {
    let (session, source, _) = create_extracted_session();
    let resource = session.pairing(source).unwrap().temp_resource().unwrap();
    assert_eq!(session.host().temp_contents(resource).as_deref(), Some("return 1;"));
}

#[test]
fn test_scratch_backing_skips_temp_resource() {
    let config = SyncConfig {
        backing: MirrorBacking::Scratch,
        ..SyncConfig::default()
    };
    let (mut session, source) = create_test_session(config);
    session.extract_now(source, selection(), 0).unwrap();
    assert!(session.pairing(source).unwrap().temp_resource().is_none());
    assert_eq!(session.host().temp_resource_count(), 0);
}

#[test]
fn test_requests_collapse_into_the_last_one() {
    let (mut session, source) = create_test_session(SyncConfig::default());
    session.request_extraction(source, range((0, 0), (0, 8)), 0);
    session.request_extraction(source, selection(), 30);
    assert_eq!(session.next_deadline(), Some(80));

    session.tick(60);
    assert!(session.registry().is_empty());
    session.tick(80);

    assert_eq!(session.registry().len(), 1);
    assert_eq!(session.host().document_count(), 2);
    let mirror = session.pairing(source).unwrap().mirror();
    assert_eq!(text(&session, mirror), "return 1;");
    assert!(!session.has_pending_requests());
}

#[test]
fn test_pending_request_follows_source_edits() {
    let (mut session, source) = create_test_session(SyncConfig::default());
    session.request_extraction(source, selection(), 0);
    session.host_mut().user_type_at(source, pos(0, 0), "// top\n");
    session.pump(10);
    session.tick(60);

    let pairing = session.pairing(source).unwrap();
    assert_eq!(pairing.tracked_range(), range((2, 2), (2, 11)));
    assert_eq!(text(&session, pairing.mirror()), "return 1;");
}

#[test]
fn test_unpumped_edits_move_request_before_it_fires() {
    let (mut session, source) = create_test_session(SyncConfig::default());
    session.request_extraction(source, selection(), 0);
    session.host_mut().user_type_at(source, pos(1, 0), "\t");
    session.tick(50);

    let mirror = session.pairing(source).unwrap().mirror();
    assert_eq!(text(&session, mirror), "return 1;");
    assert_eq!(session.pairing(source).unwrap().tracked_range(), range((1, 3), (1, 12)));
}

#[test]
fn test_invalid_selection_installs_nothing() {
    let (mut session, source) = create_test_session(SyncConfig::default());
    let err = session.extract_now(source, range((9, 0), (9, 1)), 0).unwrap_err();
    assert!(matches!(err, SyncError::InvalidSelection { .. }));
    assert!(session.registry().is_empty());
    assert_eq!(session.host().document_count(), 1);
}

#[test]
fn test_extracting_from_closed_document_is_silent() {
    let (mut session, source) = create_test_session(SyncConfig::default());
    session.request_extraction(source, selection(), 0);
    session.host_mut().user_close(source);
    // Not pumped yet: the request is still armed and fails when it fires.
    session.tick(50);
    assert!(session.registry().is_empty());
    assert!(session.host().notices().is_empty());
}

#[test]
fn test_selection_on_line_with_form_feed() {
    let mut host = MemoryHost::new();
    let source = host.open_document("fn f() {\n  a\u{c}b;\n}\n", None);
    let mut session = Session::new(host, SyncConfig::default());
    let mirror = session.extract_now(source, range((1, 2), (1, 6)), 0).unwrap();
    assert_eq!(text(&session, mirror), "a\u{c}b;");
}

// --- Propagation ---

#[test]
fn test_mirror_edit_updates_source() {
    let (mut session, source, mirror) = create_extracted_session();
    session
        .host_mut()
        .user_edit(mirror, range((0, 7), (0, 8)), "2");
    session.pump(10);

    assert_eq!(text(&session, source), "function f() {\n  return 2;\n}\n");
    let pairing = session.pairing(source).unwrap();
    assert!(pairing.is_idle());
    assert_eq!(pairing.tracked_range(), selection());
}

#[test]
fn test_source_insertion_at_range_end_grows_mirror() {
    let (mut session, source, mirror) = create_extracted_session();
    session
        .host_mut()
        .user_type_at(source, pos(1, 11), " // note");
    session.pump(0);

    session.tick(24);
    assert_eq!(text(&session, mirror), "return 1;");
    session.tick(25);
    session.pump(25);

    assert_eq!(text(&session, mirror), "return 1; // note");
    assert_eq!(session.pairing(source).unwrap().tracked_range(), range((1, 2), (1, 19)));
    assert_eq!(session.stats().source_to_mirror, 1);
}

#[test]
fn test_multiline_round_trip() {
    let (mut session, source, mirror) = create_extracted_session();
    let replacement = "let x = 1;\n  return x;";
    session
        .host_mut()
        .user_edit(mirror, range((0, 0), (0, 9)), replacement);
    session.pump(10);

    assert_eq!(
        text(&session, source),
        "function f() {\n  let x = 1;\n  return x;\n}\n"
    );
    let tracked = session.pairing(source).unwrap().tracked_range();
    assert_eq!(tracked, range((1, 2), (2, 11)));
    assert_eq!(session.host().read_range(source, tracked).unwrap(), replacement);
}

#[test]
fn test_form_feed_and_carriage_return_stay_inside_the_line() {
    let (mut session, source, mirror) = create_extracted_session();
    session.host_mut().user_type_at(mirror, pos(0, 9), "\u{c}x\ry");
    session.pump(10);
    session.host_mut().user_type_at(mirror, pos(0, 0), "z");
    session.pump(20);

    assert_eq!(text(&session, mirror), "zreturn 1;\u{c}x\ry");
    assert_eq!(
        text(&session, source),
        "function f() {\n  zreturn 1;\u{c}x\ry\n}\n"
    );
    let tracked = session.pairing(source).unwrap().tracked_range();
    assert_eq!(tracked, range((1, 2), (1, 16)));
    assert!(session.host().notices().is_empty());

    session.host_mut().user_type_at(source, pos(1, 16), "!");
    session.pump(30);
    session.tick(55);
    session.pump(55);
    assert_eq!(text(&session, mirror), "zreturn 1;\u{c}x\ry!");
}

#[test]
fn test_single_mirror_edit_causes_exactly_one_replace() {
    let (mut session, source, mirror) = create_extracted_session();
    session.host_mut().user_type_at(mirror, pos(0, 9), " ");
    session.pump(10);
    session.tick(1_000);
    session.pump(1_000);

    assert_eq!(session.host().apply_count(), 1);
    assert_eq!(text(&session, mirror), "return 1; ");
    let stats = session.stats();
    assert_eq!(stats.mirror_to_source, 1);
    assert_eq!(stats.source_to_mirror, 0);
    assert_eq!(stats.echoes_suppressed, 1);
    assert!(session.pairing(source).unwrap().is_idle());
}

#[test]
fn test_source_edits_outside_region_leave_mirror_alone() {
    let (mut session, source, mirror) = create_extracted_session();
    session
        .host_mut()
        .user_type_at(source, pos(0, 0), "// header\n");
    session.pump(0);
    session.tick(100);

    assert_eq!(session.host().apply_count(), 0);
    assert_eq!(text(&session, mirror), "return 1;");
    assert_eq!(session.pairing(source).unwrap().tracked_range(), range((2, 2), (2, 11)));
}

#[test]
fn test_unpumped_source_edits_are_absorbed_before_writing_source() {
    let (mut session, source, mirror) = create_extracted_session();
    session
        .host_mut()
        .user_edit(mirror, range((0, 7), (0, 8)), "5");
    session.host_mut().user_type_at(source, pos(0, 0), "// a\n");
    session.pump(5);

    assert_eq!(text(&session, source), "// a\nfunction f() {\n  return 5;\n}\n");
    assert_eq!(session.pairing(source).unwrap().tracked_range(), range((2, 2), (2, 11)));
}

#[test]
fn test_batch_waits_while_propagating() {
    let (mut session, source, mirror) = create_extracted_session();
    session.host_mut().user_type_at(source, pos(1, 11), "!");
    session.pump(0);
    session.tick(25);
    assert_eq!(text(&session, mirror), "return 1;!");
    // Hold the echo back so the pairing stays mid-flight.
    let echo = session.host_mut().take_events();

    session.host_mut().user_type_at(source, pos(1, 12), "?");
    session.pump(30);
    session.tick(55);
    assert_eq!(session.host().apply_count(), 1);
    assert_eq!(session.pairing(source).unwrap().pending_edits(), 1);

    for event in echo {
        session.handle(event, 60);
    }
    assert_eq!(text(&session, mirror), "return 1;!?");
    assert_eq!(session.host().apply_count(), 2);
    assert_eq!(session.pairing(source).unwrap().pending_edits(), 0);
}

#[test]
fn test_mirror_edit_during_flush_is_replayed_after_echo() {
    let (mut session, source, mirror) = create_extracted_session();
    session.host_mut().user_type_at(source, pos(1, 11), "!");
    session.pump(0);
    session.tick(25);
    let echo = session.host_mut().take_events();

    session.host_mut().user_type_at(mirror, pos(0, 0), "x");
    session.pump(26);
    assert_eq!(session.host().apply_count(), 1);

    for event in echo {
        session.handle(event, 27);
    }
    session.pump(27);
    assert_eq!(text(&session, source), "function f() {\n  xreturn 1;!\n}\n");
    assert_eq!(session.stats().mirror_to_source, 1);
}

#[test]
fn test_nested_pairings_propagate_through_both_levels() {
    let (mut session, outer, inner) = create_extracted_session();
    let innermost = session.extract_now(inner, range((0, 0), (0, 9)), 1).unwrap();
    session.pump(1);

    session
        .host_mut()
        .user_edit(innermost, range((0, 7), (0, 8)), "3");
    session.pump(2);

    assert_eq!(text(&session, inner), "return 3;");
    assert_eq!(text(&session, outer), "function f() {\n  return 3;\n}\n");
    assert_eq!(session.host().apply_count(), 2);
}

// --- Saving ---

#[test]
fn test_autosave_is_not_treated_as_user_save() {
    let (mut session, source, mirror) = create_extracted_session();
    session.host_mut().user_type_at(mirror, pos(0, 0), "x");
    session.pump(10);
    assert_eq!(session.next_deadline(), Some(410));

    session.tick(410);
    assert_eq!(session.stats().autosaves, 1);
    assert!(session.pairing(source).unwrap().is_programmatic_save());
    session.pump(410);

    assert_eq!(session.host().save_count(), 1);
    assert!(!session.pairing(source).unwrap().is_programmatic_save());
    let resource = session.pairing(source).unwrap().temp_resource().unwrap();
    assert_eq!(session.host().temp_contents(resource).as_deref(), Some("xreturn 1;"));
}

#[test]
fn test_user_save_of_mirror_saves_source_and_cancels_autosave() {
    let (mut session, _source, mirror) = create_extracted_session();
    session.host_mut().user_type_at(mirror, pos(0, 0), "x");
    session.pump(10);

    assert!(session.host_mut().user_save(mirror));
    session.pump(20);
    assert_eq!(session.host().save_count(), 2);

    session.tick(5_000);
    session.pump(5_000);
    assert_eq!(session.host().save_count(), 2);
    assert_eq!(session.stats().autosaves, 0);
}

#[test]
fn test_rapid_mirror_edits_restart_autosave() {
    let (mut session, _source, mirror) = create_extracted_session();
    session.host_mut().user_type_at(mirror, pos(0, 0), "a");
    session.pump(0);
    session.host_mut().user_type_at(mirror, pos(0, 1), "b");
    session.pump(300);

    session.tick(400);
    assert_eq!(session.stats().autosaves, 0);
    session.tick(700);
    assert_eq!(session.stats().autosaves, 1);
}

// --- Lifecycle ---

#[test]
fn test_reextraction_supersedes_open_pairing() {
    let (mut session, source, old_mirror) = create_extracted_session();
    session.request_extraction(source, range((0, 0), (0, 8)), 100);
    session.tick(150);
    session.pump(150);

    assert!(!session.host().is_open(old_mirror));
    let pairing = session.pairing(source).unwrap();
    assert_ne!(pairing.mirror(), old_mirror);
    assert_eq!(text(&session, pairing.mirror()), "function");
    assert_eq!(session.registry().len(), 1);
    assert_eq!(session.host().temp_resource_count(), 1);
    assert_eq!(session.stats().teardowns, 1);
}

#[test]
fn test_closing_mirror_suppresses_pending_request() {
    let (mut session, source, mirror) = create_extracted_session();
    session.request_extraction(source, range((0, 0), (0, 8)), 100);
    session.host_mut().user_close(mirror);
    session.pump(120);

    assert!(session.registry().is_empty());
    assert!(!session.has_pending_requests());
    session.tick(200);
    assert!(session.registry().is_empty());

    // A fresh request afterwards works normally.
    session.request_extraction(source, selection(), 300);
    session.tick(350);
    assert_eq!(session.registry().len(), 1);
}

#[test]
fn test_hidden_mirror_closes_pairing() {
    let (mut session, source, mirror) = create_extracted_session();
    session.host_mut().hide(mirror);
    session.pump(5);

    assert!(session.pairing(source).is_none());
    assert!(!session.host().is_open(mirror));
    assert_eq!(session.host().highlight(source), None);
    assert_eq!(session.host().temp_resource_count(), 0);
}

#[test]
fn test_closing_source_force_closes_mirror() {
    let (mut session, source, mirror) = create_extracted_session();
    session.host_mut().user_close(source);
    session.pump(5);
    assert!(session.registry().is_empty());
    assert!(!session.host().is_open(mirror));
}

#[test]
fn test_closed_pairing_is_inert() {
    let (mut session, source, mirror) = create_extracted_session();
    session.host_mut().user_type_at(mirror, pos(0, 0), "x");
    session.pump(10);
    let applied = session.host().apply_count();

    assert!(session.close(source));
    session.host_mut().user_type_at(source, pos(1, 2), "y");
    session.pump(20);
    session.tick(10_000);
    session.pump(10_000);

    assert_eq!(session.host().apply_count(), applied);
    assert_eq!(session.host().save_count(), 0);
    assert_eq!(session.stats().autosaves, 0);
    assert!(!session.host().is_open(mirror));
}

#[test]
fn test_teardown_is_idempotent() {
    let (mut session, source, _) = create_extracted_session();
    assert!(session.close(source));
    assert!(!session.close(source));
    session.pump(0);
    assert_eq!(session.stats().teardowns, 1);
}

#[test]
fn test_shutdown_closes_everything() {
    let (mut session, source, mirror) = create_extracted_session();
    let other = session.host_mut().open_document("a\nb\n", None);
    let other_mirror = session.extract_now(other, range((1, 0), (1, 1)), 0).unwrap();
    session.request_extraction(source, selection(), 0);

    session.shutdown();
    session.pump(0);
    assert!(session.registry().is_empty());
    assert!(!session.has_pending_requests());
    assert!(!session.host().is_open(mirror));
    assert!(!session.host().is_open(other_mirror));
    assert_eq!(session.host().temp_resource_count(), 0);
    assert_eq!(session.next_deadline(), None);
    assert_eq!(session.stats().teardowns, 2);
}

// --- Failure paths ---

#[test]
fn test_open_failure_releases_temp_resource() {
    let (mut session, source) = create_test_session(SyncConfig::default());
    session.host_mut().fail_with(FailurePlan {
        open: true,
        ..FailurePlan::default()
    });
    let err = session.extract_now(source, selection(), 0).unwrap_err();
    assert!(matches!(err, SyncError::OpenFailed(_)));
    assert!(session.registry().is_empty());
    assert_eq!(session.host().temp_resource_count(), 0);
}

#[test]
fn test_show_failure_closes_mirror() {
    let (mut session, source) = create_test_session(SyncConfig::default());
    session.host_mut().fail_with(FailurePlan {
        show: true,
        ..FailurePlan::default()
    });
    let err = session.extract_now(source, selection(), 0).unwrap_err();
    assert!(matches!(err, SyncError::ShowFailed(_)));
    session.pump(0);
    assert!(session.registry().is_empty());
    assert_eq!(session.host().document_count(), 1);
    assert_eq!(session.host().temp_resource_count(), 0);
}

#[test]
fn test_failed_request_is_reported_to_user() {
    let (mut session, source) = create_test_session(SyncConfig::default());
    session.host_mut().fail_with(FailurePlan {
        open: true,
        ..FailurePlan::default()
    });
    session.request_extraction(source, selection(), 0);
    session.tick(50);
    let errors = notices(&session, NoticeLevel::Error);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Could not open mirror"));
}

#[test]
fn test_temp_write_failure_falls_back_to_unbacked_mirror() {
    let (mut session, source) = create_test_session(SyncConfig::default());
    session.host_mut().fail_with(FailurePlan {
        temp_write: true,
        ..FailurePlan::default()
    });
    let mirror = session.extract_now(source, selection(), 0).unwrap();

    assert_eq!(text(&session, mirror), "return 1;");
    assert!(session.pairing(source).unwrap().temp_resource().is_none());
    assert_eq!(notices(&session, NoticeLevel::Warning).len(), 1);
}

#[test]
fn test_temp_delete_failure_still_tears_down() {
    let (mut session, source, mirror) = create_extracted_session();
    session.host_mut().fail_with(FailurePlan {
        temp_delete: true,
        ..FailurePlan::default()
    });
    assert!(session.close(source));
    assert!(session.registry().is_empty());
    assert!(!session.host().is_open(mirror));
    assert_eq!(notices(&session, NoticeLevel::Warning).len(), 1);
}

#[test]
fn test_apply_failure_recovers_on_next_edit() {
    let (mut session, source, mirror) = create_extracted_session();
    session.host_mut().fail_with(FailurePlan {
        apply: true,
        ..FailurePlan::default()
    });
    session.host_mut().user_type_at(mirror, pos(0, 0), "a");
    session.pump(10);

    assert_eq!(text(&session, source), SOURCE);
    assert!(session.pairing(source).unwrap().is_idle());
    assert_eq!(notices(&session, NoticeLevel::Error).len(), 1);

    session.host_mut().fail_with(FailurePlan::default());
    session.host_mut().user_type_at(mirror, pos(0, 1), "b");
    session.pump(20);
    assert_eq!(text(&session, source), "function f() {\n  abreturn 1;\n}\n");
}

#[test]
fn test_autosave_failure_clears_programmatic_flag() {
    let (mut session, source, mirror) = create_extracted_session();
    session.host_mut().user_type_at(mirror, pos(0, 0), "x");
    session.pump(0);
    session.host_mut().fail_with(FailurePlan {
        save: true,
        ..FailurePlan::default()
    });
    session.tick(400);

    assert!(!session.pairing(source).unwrap().is_programmatic_save());
    assert_eq!(session.stats().autosaves, 0);
    let errors = notices(&session, NoticeLevel::Error);
    assert!(errors[0].starts_with("Could not save"));
}

#[test]
fn test_stats_start_at_zero() {
    let (session, _) = create_test_session(SyncConfig::default());
    assert_eq!(session.stats(), SyncStats::default());
}
