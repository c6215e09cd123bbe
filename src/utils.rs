#[cfg(target_os = "macos")]
use std::path::Path;
#[cfg(target_os = "macos")]
use std::sync::OnceLock;

/// Find an executable in common locations, falling back to PATH.
/// Results are cached for efficiency.
#[cfg(target_os = "macos")]
pub fn find_command(name: &str) -> &'static str {
    match name {
        "terminal-notifier" => {
            static NOTIFIER: OnceLock<&'static str> = OnceLock::new();
            NOTIFIER.get_or_init(|| find_in_paths(name, HOMEBREW_PATHS))
        }
        _ => find_in_paths(name, HOMEBREW_PATHS),
    }
}

#[cfg(target_os = "macos")]
const HOMEBREW_PATHS: &[&str] = &[
    "/opt/homebrew/bin", // Apple Silicon
    "/usr/local/bin",    // Intel Mac
];

#[cfg(target_os = "macos")]
fn find_in_paths(name: &str, prefix_paths: &[&str]) -> &'static str {
    for prefix in prefix_paths {
        let full_path = format!("{}/{}", prefix, name);
        if Path::new(&full_path).exists() {
            // Leak the string to get a 'static lifetime (acceptable for small, cached strings)
            return Box::leak(full_path.into_boxed_str());
        }
    }
    Box::leak(name.to_string().into_boxed_str())
}

/// Command that runs without flashing a console window.
#[cfg(target_os = "windows")]
pub fn hidden_command(program: &str) -> std::process::Command {
    use std::os::windows::process::CommandExt;

    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    let mut command = std::process::Command::new(program);
    command.creation_flags(CREATE_NO_WINDOW);
    command
}
