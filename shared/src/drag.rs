use crate::geometry::{clamp_position, PageSize};
use crate::overlay::{OverlayId, SignatureOverlay};

/// Client-space rectangle of a page container.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ContainerRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ContainerRect {
    pub fn size(&self) -> PageSize {
        PageSize::new(self.width, self.height)
    }

    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x < self.left + self.width && y >= self.top && y < self.top + self.height
    }
}

/// The surface holding page containers. `reparent` must move the overlay
/// element in one step; it never leaves it attached to two pages.
pub trait PageHost {
    type Error;

    fn container_at(&self, x: f64, y: f64) -> Option<usize>;
    fn container_rect(&self, page_index: usize) -> Option<ContainerRect>;
    fn reparent(&mut self, overlay: OverlayId, to_page: usize) -> Result<(), Self::Error>;
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragFrame {
    pub overlay: OverlayId,
    pub start_x: f64,
    pub start_y: f64,
    pub initial_left: f64,
    pub initial_top: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DragState {
    Idle,
    Dragging(DragFrame),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DragStep {
    pub page_index: usize,
    pub left: f64,
    pub top: f64,
    pub reparented: bool,
}

#[derive(Debug)]
pub struct DragController {
    state: DragState,
}

impl Default for DragController {
    fn default() -> Self {
        Self::new()
    }
}

impl DragController {
    pub fn new() -> Self {
        Self {
            state: DragState::Idle,
        }
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging(_))
    }

    pub fn active_overlay(&self) -> Option<OverlayId> {
        match self.state {
            DragState::Dragging(frame) => Some(frame.overlay),
            DragState::Idle => None,
        }
    }

    /// Idle -> Dragging. Ignored while another drag is in progress.
    pub fn begin(&mut self, overlay: &SignatureOverlay, x: f64, y: f64) -> bool {
        if self.is_dragging() {
            return false;
        }
        self.state = DragState::Dragging(DragFrame {
            overlay: overlay.id,
            start_x: x,
            start_y: y,
            initial_left: overlay.left,
            initial_top: overlay.top,
        });
        true
    }

    /// Applies one pointer move. Crossing onto another page container moves
    /// the overlay there and recentres it under the pointer; page index and
    /// attachment change together or not at all.
    pub fn drag_to<H: PageHost>(
        &mut self,
        overlay: &mut SignatureOverlay,
        x: f64,
        y: f64,
        host: &mut H,
    ) -> Result<Option<DragStep>, H::Error> {
        let frame = match &mut self.state {
            DragState::Dragging(frame) if frame.overlay == overlay.id => frame,
            _ => return Ok(None),
        };

        let mut left = frame.initial_left + (x - frame.start_x);
        let mut top = frame.initial_top + (y - frame.start_y);
        let mut reparented = false;

        if let Some(target) = host.container_at(x, y) {
            if target != overlay.page_index {
                if let Some(rect) = host.container_rect(target) {
                    host.reparent(overlay.id, target)?;
                    overlay.page_index = target;
                    frame.initial_left = x - rect.left - overlay.width / 2.0;
                    frame.initial_top = y - rect.top - overlay.height / 2.0;
                    frame.start_x = x;
                    frame.start_y = y;
                    left = frame.initial_left;
                    top = frame.initial_top;
                    reparented = true;
                }
            }
        }

        let Some(parent) = host.container_rect(overlay.page_index) else {
            return Ok(None);
        };
        let (left, top) = clamp_position(left, top, parent.size(), overlay.size());
        overlay.left = left;
        overlay.top = top;
        Ok(Some(DragStep {
            page_index: overlay.page_index,
            left,
            top,
            reparented,
        }))
    }

    /// Dragging -> Idle. The last applied position is kept.
    pub fn end(&mut self) -> Option<OverlayId> {
        let overlay = self.active_overlay();
        self.state = DragState::Idle;
        overlay
    }
}
