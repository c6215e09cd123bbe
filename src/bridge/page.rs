//! In-page half of the bridge. The script runs inside the content with no
//! access beyond `window.ipc.postMessage`, and exposes two capabilities the
//! shell calls back into.

use super::message::PROTOCOL_VERSION;

/// Global the page-side capabilities are published under.
pub const API_OBJECT: &str = "__chatwrap";

const PAGE_SCRIPT: &str = include_str!("page.js");

// Acknowledges with `cleanupDone` once every registration has settled
const CLEAR_SERVICE_WORKERS: &str = r#"(function () {
  var done = function () {
    window.ipc.postMessage(JSON.stringify({ v: __PROTOCOL_VERSION__, kind: 'cleanupDone' }));
  };
  if (!navigator.serviceWorker) {
    done();
    return;
  }
  navigator.serviceWorker
    .getRegistrations()
    .then(function (registrations) {
      return Promise.all(registrations.map(function (r) { return r.unregister(); }));
    })
    .then(done, done);
})();"#;

pub fn init_script() -> String {
    PAGE_SCRIPT
        .replace("__API_NAME__", API_OBJECT)
        .replace("__PROTOCOL_VERSION__", &PROTOCOL_VERSION.to_string())
}

pub fn trigger_initial_badge_update() -> String {
    capability_call("triggerInitialBadgeUpdate")
}

pub fn cleanup() -> String {
    capability_call("cleanup")
}

pub fn clear_service_workers() -> String {
    CLEAR_SERVICE_WORKERS.replace("__PROTOCOL_VERSION__", &PROTOCOL_VERSION.to_string())
}

fn capability_call(name: &str) -> String {
    format!("window.{API_OBJECT} && window.{API_OBJECT}.{name}();")
}

#[cfg(test)]
mod tests {
    use boa_engine::{Context, Source};
    use serde_json::{Value, json};

    use super::*;

    // Minimal browser surface the page script touches
    const FAKE_PAGE: &str = r#"
var posted = [];
var created = [];
var console = { warn: function () {} };
var navigator = {};
var window = {
  ipc: { postMessage: function (raw) { posted.push(JSON.parse(raw)); } },
  addEventListener: function () {},
};
window.top = window;
window.self = window;
var document = {
  title: '',
  readyState: 'complete',
  head: null,
  querySelector: function () { return null; },
};
function setTitle(title) {
  document.title = title;
  window.__chatwrap.triggerInitialBadgeUpdate();
}
"#;

    /// Runs `setup`, the page script, then `scenario`, and returns the JSON
    /// value of the scenario's final expression.
    fn run_page(setup: &str, scenario: &str) -> Value {
        let source = format!("{FAKE_PAGE}\n{setup}\n{}\n{scenario}", init_script());
        let mut context = Context::default();
        let value = context.eval(Source::from_bytes(source.as_bytes())).unwrap();
        let _ = context.run_jobs();
        let raw = value.to_string(&mut context).unwrap().to_std_string_escaped();
        serde_json::from_str(&raw).unwrap()
    }

    fn badge_counts(titles: &[&str]) -> Value {
        let calls: String = titles
            .iter()
            .map(|title| format!("setTitle({});", json!(title)))
            .collect();
        run_page(
            "",
            &format!(
                "{calls} JSON.stringify(posted.filter(function (m) {{ return m.kind === 'updateBadge'; }}).map(function (m) {{ return m.count; }}));"
            ),
        )
    }

    #[test]
    fn script_has_no_placeholders_left() {
        let script = init_script();
        assert!(!script.contains("__API_NAME__"));
        assert!(!script.contains("__PROTOCOL_VERSION__"));
        assert!(script.contains("var VERSION = 1;"));
        assert!(!clear_service_workers().contains("__PROTOCOL_VERSION__"));
    }

    #[test]
    fn title_parsing() {
        assert_eq!(badge_counts(&["(3) WhatsApp"]), json!([3]));
        assert_eq!(badge_counts(&["WhatsApp"]), json!([0]));
        assert_eq!(badge_counts(&["(x) WhatsApp"]), json!([0]));
        assert_eq!(badge_counts(&["WhatsApp (3)"]), json!([0]));
    }

    #[test]
    fn badge_forwarding_is_edge_triggered() {
        assert_eq!(badge_counts(&["WhatsApp", "WhatsApp"]), json!([0]));
        assert_eq!(
            badge_counts(&["WhatsApp", "(3) WhatsApp", "(3) WhatsApp", "(5) WhatsApp"]),
            json!([0, 3, 5])
        );
    }

    #[test]
    fn messages_carry_protocol_version() {
        let posted = run_page("", "setTitle('(2) WhatsApp'); JSON.stringify(posted);");
        assert_eq!(posted, json!([{"v": 1, "kind": "updateBadge", "count": 2}]));
    }

    #[test]
    fn notifications_are_granted_without_a_page_notification() {
        let result = run_page(
            "",
            r#"
var n = new window.Notification('Ana', { body: 'hi', icon: 'blob:x' });
n.close();
var asked = null;
window.Notification.requestPermission(function (p) { asked = p; });
JSON.stringify({ permission: window.Notification.permission, asked: asked, title: n.title, posted: posted });
"#,
        );
        assert_eq!(result["permission"], "granted");
        assert_eq!(result["asked"], "granted");
        assert_eq!(result["title"], "Ana");
        assert_eq!(
            result["posted"],
            json!([{"v": 1, "kind": "notify", "title": "Ana", "body": "hi", "icon": "blob:x"}])
        );
    }

    #[test]
    fn page_notification_still_runs_and_reports_granted() {
        let result = run_page(
            r#"
window.Notification = function (title) { created.push(title); };
window.Notification.permission = 'denied';
"#,
            r#"
new window.Notification('Ben', { body: 'yo' });
JSON.stringify({ permission: window.Notification.permission, created: created, kinds: posted.map(function (m) { return m.kind; }) });
"#,
        );
        assert_eq!(result["permission"], "granted");
        assert_eq!(result["created"], json!(["Ben"]));
        assert_eq!(result["kinds"], json!(["notify"]));
    }

    #[test]
    fn api_object_is_frozen_and_cleanup_is_idempotent() {
        let result = run_page(
            "",
            r#"
window.__chatwrap.cleanup();
window.__chatwrap.cleanup();
JSON.stringify({ frozen: Object.isFrozen(window.__chatwrap), keys: Object.keys(window.__chatwrap).sort() });
"#,
        );
        assert_eq!(result["frozen"], true);
        assert_eq!(result["keys"], json!(["cleanup", "triggerInitialBadgeUpdate"]));
    }

    #[test]
    fn service_worker_cleanup_acknowledges() {
        let without_workers = run_page("", &format!("{} JSON.stringify(posted);", clear_service_workers()));
        assert_eq!(without_workers, json!([{"v": 1, "kind": "cleanupDone"}]));

        let setup = r#"
var unregistered = 0;
navigator.serviceWorker = {
  getRegistrations: function () {
    var r = { unregister: function () { unregistered += 1; return Promise.resolve(true); } };
    return Promise.resolve([r, r]);
  },
};
"#;
        let result = run_page(
            setup,
            &format!(
                "{} var report = {{ toString: function () {{ return JSON.stringify({{ unregistered: unregistered, posted: posted }}); }} }}; report;",
                clear_service_workers()
            ),
        );
        assert_eq!(result["unregistered"], 2);
        assert_eq!(result["posted"], json!([{"v": 1, "kind": "cleanupDone"}]));
    }

    #[test]
    fn capability_calls_guard_missing_api() {
        assert_eq!(
            trigger_initial_badge_update(),
            "window.__chatwrap && window.__chatwrap.triggerInitialBadgeUpdate();"
        );
        assert_eq!(
            cleanup(),
            "window.__chatwrap && window.__chatwrap.cleanup();"
        );
    }
}
