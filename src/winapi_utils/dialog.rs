//! Modal message boxes.

use windows::core::HSTRING;
use windows::Win32::UI::WindowsAndMessaging::{
    MessageBoxW, IDOK, MB_ICONQUESTION, MB_OKCANCEL, MB_SETFOREGROUND, MB_TOPMOST,
};

/// Shows an OK/Cancel box and blocks until it is closed.
///
/// Returns `true` if the user pressed OK.
pub fn confirm_ok_cancel(title: &str, body: &str) -> bool {
    let text = HSTRING::from(body);
    let caption = HSTRING::from(title);
    let result = unsafe {
        MessageBoxW(
            None,
            &text,
            &caption,
            MB_OKCANCEL | MB_ICONQUESTION | MB_TOPMOST | MB_SETFOREGROUND,
        )
    };
    result == IDOK
}
