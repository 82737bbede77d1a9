//! Channel router: pulls a frame range out of a mono source and drops it
//! into exactly one channel of an interleaved hardware-width scratch buffer.
//!
//! Runs on the control thread only, before anything is scheduled; it's
//! allowed to allocate and resize. The render side never sees a scratch
//! buffer until the transport has finished writing it.

/// Resize `dest` to `count` frames at `channels` width, zero everything,
/// then copy `source[start..start + count]` into channel `target` only.
///
/// A target channel outside the destination width is a no-op (stems beyond
/// the hardware channel count were already dropped at load time; this is
/// the backstop). A source shorter than the requested range leaves the
/// tail of the slot silent rather than failing.
pub fn slice_into(
    source: &[f32],
    dest: &mut Vec<f32>,
    channels: usize,
    start: usize,
    count: usize,
    target: usize,
) {
    if target >= channels {
        return;
    }
    dest.clear();
    dest.resize(count * channels, 0.0);

    let available = source.len().saturating_sub(start).min(count);
    for i in 0..available {
        dest[i * channels + target] = source[start + i];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_range_into_one_channel_and_zeroes_the_rest() {
        let source = [1.0f32, 2.0, 3.0, 4.0, 5.0];
        let mut dest = Vec::new();
        slice_into(&source, &mut dest, 4, 1, 3, 2);

        assert_eq!(dest.len(), 12); // 3 frames, 4 channels
        for frame in 0..3 {
            for ch in 0..4 {
                let s = dest[frame * 4 + ch];
                if ch == 2 {
                    assert_eq!(s, source[1 + frame]);
                } else {
                    assert_eq!(s, 0.0, "channel {ch} frame {frame} must stay silent");
                }
            }
        }
        assert_eq!(dest[2], 2.0);
        assert_eq!(dest[6], 3.0);
        assert_eq!(dest[10], 4.0);
    }

    #[test]
    fn out_of_range_channel_is_a_no_op() {
        let source = [1.0f32; 8];
        let mut dest = vec![7.0f32; 4];
        slice_into(&source, &mut dest, 2, 0, 4, 2);
        assert_eq!(dest, vec![7.0; 4]); // untouched
    }

    #[test]
    fn short_source_leaves_the_tail_silent() {
        let source = [1.0f32, 1.0];
        let mut dest = Vec::new();
        slice_into(&source, &mut dest, 1, 1, 4, 0);
        assert_eq!(dest, vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn scratch_is_fully_overwritten_on_reuse() {
        let mut dest = vec![9.0f32; 64];
        slice_into(&[0.5f32; 16], &mut dest, 2, 0, 2, 0);
        assert_eq!(dest, vec![0.5, 0.0, 0.5, 0.0]);
    }
}
