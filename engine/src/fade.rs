use crate::bucket::{PlacedSymbol, SymbolBucket};
use crate::opacity::{FadeTiming, OpacityState, VisibilityChange, pack_opacity, update_opacity};

/// Advance every instance's fade to `now` and rewrite the bucket's packed
/// opacity streams.
///
/// Streams are cleared and refilled in instance order, then flushed to their
/// buffers when those were already uploaded.
pub fn update_opacities(bucket: &mut SymbolBucket, timing: &mut FadeTiming, now: f64) {
    let SymbolBucket {
        symbol_instances,
        placed_glyphs,
        text_opacity,
        icon_opacity,
        fade_start_time,
        ..
    } = bucket;

    if let Some(stream) = text_opacity.as_mut() {
        stream.array.clear();
    }
    if let Some(stream) = icon_opacity.as_mut() {
        stream.array.clear();
    }
    *fade_start_time = now;

    for instance in symbol_instances.iter_mut() {
        let is_duplicate = instance.is_duplicate;

        if instance.has_text() {
            let change = update_opacity(
                is_duplicate,
                &mut instance.text_opacity_state,
                instance.placed_text,
                now,
                timing,
            );
            if change.is_change() {
                mark_hidden(
                    placed_glyphs,
                    &instance.placed_text_symbol_indices,
                    &instance.text_opacity_state,
                    change,
                );
            }
            if let Some(stream) = text_opacity.as_mut() {
                stream.array.extend_repeat(
                    pack_opacity(&instance.text_opacity_state),
                    instance.text_opacity_entries(),
                );
            }
        }

        if instance.has_icon() {
            update_opacity(
                is_duplicate,
                &mut instance.icon_opacity_state,
                instance.placed_icon,
                now,
                timing,
            );
            if let Some(stream) = icon_opacity.as_mut() {
                stream.array.extend_repeat(
                    pack_opacity(&instance.icon_opacity_state),
                    instance.icon_opacity_entries(),
                );
            }
        }
    }

    for stream in [text_opacity.as_mut(), icon_opacity.as_mut()].into_iter().flatten() {
        stream.flush();
    }
}

fn mark_hidden(
    placed_glyphs: &mut [PlacedSymbol],
    indices: &[usize],
    state: &OpacityState,
    change: VisibilityChange,
) {
    debug_assert!(change.is_change());
    let hidden = state.is_hidden();
    for &index in indices {
        if let Some(symbol) = placed_glyphs.get_mut(index) {
            symbol.hidden = hidden;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::SymbolInstance;
    use crate::layout::SymbolLayout;
    use crate::opacity::unpack_opacity;
    use crate::symbol_size::SizeData;
    use crate::vertex::tests::RecordingBuffer;

    fn text_instance(key: &str) -> SymbolInstance {
        SymbolInstance {
            num_glyph_vertices: 8,
            num_vertical_glyph_vertices: 4,
            placed_text_symbol_indices: vec![0],
            ..SymbolInstance::new(key, 0..1, 1..1)
        }
    }

    fn bucket(instances: Vec<SymbolInstance>) -> SymbolBucket {
        SymbolBucket::new(0.0, SymbolLayout::default(), SizeData::default(), instances).with_line_geometry(
            vec![PlacedSymbol {
                hidden: true,
                ..PlacedSymbol::default()
            }],
            Vec::new(),
            Vec::new(),
        )
    }

    fn text_words(bucket: &SymbolBucket) -> Vec<u32> {
        bucket
            .text_opacity
            .as_ref()
            .map(|stream| stream.array.as_slice().to_vec())
            .unwrap_or_default()
    }

    #[test]
    fn placed_text_fades_in_over_duration() {
        let mut bucket = bucket(vec![SymbolInstance {
            placed_text: true,
            ..text_instance("a")
        }]);
        let mut timing = FadeTiming::new(300.0);

        update_opacities(&mut bucket, &mut timing, 0.0);
        let state = bucket.symbol_instances[0].text_opacity_state;
        assert_eq!(state.opacity, 0.0);
        assert_eq!(state.target_opacity, 1.0);
        assert_eq!(timing.latest_start, 0.0);
        assert!(!bucket.placed_glyphs[0].hidden);

        update_opacities(&mut bucket, &mut timing, 300.0);
        let state = bucket.symbol_instances[0].text_opacity_state;
        assert_eq!(state.opacity, 1.0);
        assert!(!bucket.placed_glyphs[0].hidden);
        assert_eq!(bucket.fade_start_time, 300.0);
        assert_eq!(text_words(&bucket), vec![u32::MAX; 3]);
        assert!(!timing.is_fading(300.0));
    }

    #[test]
    fn faded_out_text_marks_glyphs_hidden() {
        let mut instance = text_instance("a");
        instance.text_opacity_state = OpacityState {
            opacity: 1.0,
            target_opacity: 1.0,
            time: 0.0,
        };
        let mut bucket = bucket(vec![instance]);
        bucket.placed_glyphs[0].hidden = false;
        let mut timing = FadeTiming::new(100.0);

        update_opacities(&mut bucket, &mut timing, 50.0);
        assert!(!bucket.placed_glyphs[0].hidden);
        let (opacity, target_visible) = unpack_opacity(text_words(&bucket)[0]);
        assert!(opacity > 0.99 && !target_visible);

        update_opacities(&mut bucket, &mut timing, 150.0);
        assert!(bucket.symbol_instances[0].text_opacity_state.is_hidden());
        assert!(bucket.placed_glyphs[0].hidden);
        assert_eq!(text_words(&bucket), vec![0; 3]);
    }

    #[test]
    fn duplicates_stay_hidden() {
        let mut bucket = bucket(vec![SymbolInstance {
            is_duplicate: true,
            placed_text: true,
            ..text_instance("dup")
        }]);
        let mut timing = FadeTiming::new(0.0);
        update_opacities(&mut bucket, &mut timing, 10.0);
        assert!(bucket.symbol_instances[0].text_opacity_state.is_hidden());
        assert_eq!(text_words(&bucket), vec![0; 3]);
    }

    #[test]
    fn icons_write_one_word_per_quad() {
        let instance = SymbolInstance {
            num_icon_vertices: 8,
            placed_icon: true,
            ..SymbolInstance::new("icon", 0..0, 0..1)
        };
        let mut bucket = bucket(vec![instance]);
        let mut timing = FadeTiming::new(0.0);
        update_opacities(&mut bucket, &mut timing, 1.0);
        update_opacities(&mut bucket, &mut timing, 2.0);

        assert!(bucket.text_opacity.is_none());
        let words = bucket
            .icon_opacity
            .as_ref()
            .map(|stream| stream.array.as_slice().to_vec())
            .unwrap_or_default();
        assert_eq!(words, vec![u32::MAX; 2]);
    }

    #[test]
    fn streams_are_refilled_and_flushed_when_uploaded() {
        let recorder = RecordingBuffer::default();
        let mut bucket = bucket(vec![SymbolInstance {
            placed_text: true,
            ..text_instance("a")
        }]);
        if let Some(stream) = bucket.text_opacity.as_mut() {
            stream.attach_buffer(Box::new(recorder.clone()));
        }
        let mut timing = FadeTiming::new(0.0);

        update_opacities(&mut bucket, &mut timing, 1.0);
        let capacity = bucket.text_opacity.as_ref().map(|s| s.array.capacity());
        update_opacities(&mut bucket, &mut timing, 2.0);

        assert_eq!(text_words(&bucket).len(), 3);
        assert_eq!(bucket.text_opacity.as_ref().map(|s| s.array.capacity()), capacity);
        assert_eq!(recorder.upload_count(), 2);
        assert_eq!(recorder.last_upload(), Some(vec![0xFF; 12]));
    }
}
