//! Windows toast notifications using PowerShell

use log::debug;

use crate::bridge::NotificationRequest;
use crate::config::APP_TITLE;
use crate::utils::hidden_command;

const APP_ID: &str = "Chatwrap.App";

pub fn is_supported() -> bool {
    true
}

/// Toasts raised from PowerShell cannot call back into the process, so a
/// click only dismisses the toast and `on_click` is never invoked.
pub fn show<F>(request: &NotificationRequest, _on_click: F)
where
    F: FnOnce() + Send + 'static,
{
    debug!("Toast clicks are not routed back on Windows");
    show_toast_powershell(
        &request.title,
        &request.body,
        &request.icon.to_string_lossy(),
    );
}

// Text lands inside a literal here-string, so only XML escaping applies
fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn show_toast_powershell(title: &str, body: &str, icon_path: &str) {
    let title = escape(title);
    let body = escape(body);
    let icon_path = escape(icon_path);

    let xml_image_node = if icon_path.is_empty() {
        String::new()
    } else {
        format!(r#"<image placement="appLogoOverride" src="{}" />"#, icon_path)
    };

    let script = format!(
        r#"
$ErrorActionPreference = 'SilentlyContinue'
[Windows.UI.Notifications.ToastNotificationManager, Windows.UI.Notifications, ContentType = WindowsRuntime] | Out-Null
[Windows.Data.Xml.Dom.XmlDocument, Windows.Data.Xml.Dom.XmlDocument, ContentType = WindowsRuntime] | Out-Null

$template = @'
<toast>
    <visual>
        <binding template="ToastGeneric">
            <text>{title}</text>
            <text>{body}</text>
            {xml_image_node}
        </binding>
    </visual>
</toast>
'@

$xml = New-Object Windows.Data.Xml.Dom.XmlDocument
$xml.LoadXml($template)
$toast = [Windows.UI.Notifications.ToastNotification]::new($xml)
[Windows.UI.Notifications.ToastNotificationManager]::CreateToastNotifier('{app_id}').Show($toast)
"#,
        title = title,
        body = body,
        xml_image_node = xml_image_node,
        app_id = APP_ID,
    );

    debug!("Showing {} toast", APP_TITLE);
    // Hidden to prevent console flicker; not awaited
    let _ = hidden_command("powershell")
        .args([
            "-NoProfile",
            "-NonInteractive",
            "-WindowStyle",
            "Hidden",
            "-Command",
            script.as_str(),
        ])
        .spawn();
}
