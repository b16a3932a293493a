use crate::collision_box::CollisionCircle;
use crate::vertex::{CollisionDebugVertex, VertexStream};

/// Writes the collision debug overlay of one bucket during placement.
///
/// Streams are only written when debugging is on and the bucket was built
/// with debug geometry; they are cleared up front and re-filled in instance
/// order.
pub struct DebugEmitter<'a> {
    boxes: Option<&'a mut VertexStream<CollisionDebugVertex>>,
    circles: Option<&'a mut VertexStream<CollisionDebugVertex>>,
}

impl<'a> DebugEmitter<'a> {
    pub fn new(
        show: bool,
        boxes: Option<&'a mut VertexStream<CollisionDebugVertex>>,
        circles: Option<&'a mut VertexStream<CollisionDebugVertex>>,
    ) -> Self {
        let active = |stream: Option<&'a mut VertexStream<CollisionDebugVertex>>| {
            stream
                .filter(|stream| show && !stream.array.is_empty())
                .map(|stream| {
                    stream.array.clear();
                    stream
                })
        };
        Self {
            boxes: active(boxes),
            circles: active(circles),
        }
    }

    pub fn is_active(&self) -> bool {
        self.boxes.is_some() || self.circles.is_some()
    }

    pub fn emit_box(&mut self, placed: bool) {
        if let Some(stream) = self.boxes.as_deref_mut() {
            stream
                .array
                .extend_repeat(CollisionDebugVertex::new(placed, false), 4);
        }
    }

    pub fn emit_circles(&mut self, circles: &[CollisionCircle], placed: bool, is_duplicate: bool) {
        if let Some(stream) = self.circles.as_deref_mut() {
            for circle in circles {
                let not_used = is_duplicate || !circle.used;
                stream
                    .array
                    .extend_repeat(CollisionDebugVertex::new(placed, not_used), 4);
            }
        }
    }

    /// Flush whichever streams were written.
    pub fn finish(self) {
        for stream in [self.boxes, self.circles].into_iter().flatten() {
            stream.flush();
        }
    }
}
