//! WAV playback through `PlaySoundW`.

use crate::error::AlertError;
use std::path::Path;
use windows::core::HSTRING;
use windows::Win32::Media::Audio::{PlaySoundW, SND_FILENAME, SND_NODEFAULT, SND_SYNC};

/// Plays a WAV file and returns when it has finished.
pub fn play_wav_sync(path: &Path) -> Result<(), AlertError> {
    let file = HSTRING::from(path.as_os_str());
    let played = unsafe { PlaySoundW(&file, None, SND_FILENAME | SND_SYNC | SND_NODEFAULT) };
    if played.as_bool() {
        Ok(())
    } else {
        Err(AlertError::SendFailed(format!(
            "PlaySoundW failed for {}",
            path.display()
        )))
    }
}
