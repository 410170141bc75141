// Pages survive a bincode round trip together with their history

use pagekeep_core::tracing::init_test_logging;
use pagekeep_core::{visit_children, Model, ModelValue, Page};

fn guestbook() -> Page {
    let mut page = Page::new(4, "Guestbook");
    let root = page.root();
    let form = page.add(root, "form").unwrap();
    let text = page.add_with_model(form, "text", Some(Model::new("hello"))).unwrap();
    page.track_changes();

    page.set_model_object(text, "edited").unwrap();
    page.add(root, "comments").unwrap();
    page.end_version().unwrap();
    page
}

#[test]
fn decoded_page_keeps_history_and_drops_transient_state() {
    init_test_logging();
    let mut page = guestbook();
    let form = page.get("form").unwrap();
    page.set_transient(form, "focus", true).unwrap();
    page.bind_session("session-1");
    page.touch(17);

    let bytes = bincode::serialize(&page).unwrap();
    let mut decoded: Page = bincode::deserialize(&bytes).unwrap();

    assert_eq!(decoded.page_id(), 4);
    assert_eq!(decoded.page_type(), "Guestbook");
    assert_eq!(decoded.current_version(), 1);
    assert!(decoded.is_tracking_changes());
    assert_eq!(decoded.hierarchy_as_string(), page.hierarchy_as_string());
    assert!(decoded.session_id().is_none());
    assert!(decoded.last_request().is_none());
    assert!(!decoded.is_attached());

    let text = decoded.get("form:text").unwrap();
    let old = decoded.get_version(0).unwrap();
    assert_eq!(old.model_object(text), Some(&ModelValue::from("hello")));
    assert!(old.get("comments").is_none());
}

#[test]
fn clone_rewinds_independently() {
    let page = guestbook();
    let mut copy = page.clone();
    copy.get_version(0).unwrap();
    assert_eq!(copy.current_version(), 0);
    assert!(copy.get("comments").is_none());
    assert_eq!(page.current_version(), 1);
    assert!(page.get("comments").is_some());
}

#[test]
fn paths_follow_insertion_order() {
    let page = guestbook();
    let mut paths = Vec::new();
    visit_children::<_, (), _>(&page, page.root(), |node, _visit| {
        paths.push(page.path(node).unwrap());
    });
    assert_eq!(paths, vec!["form", "form:text", "comments"]);
}
