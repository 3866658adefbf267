//! Widget geometry derived from the display metrics

use shared_protocol::{DisplayMetrics, Point, Rect, Size};

const CONTROL_DP: u32 = 56;
const CONTROL_EDGE_MARGIN_DP: u32 = 16;
const ZONE_WIDGET_DP: u32 = 64;
const ZONE_WIDGET_BOTTOM_MARGIN_DP: u32 = 48;
const ZONE_HIT_HEIGHT_DP: u32 = 120;
const ZONE_HIT_HALF_WIDTH_DP: u32 = 60;
const PANEL_WIDTH_DP: u32 = 280;
const PANEL_HEIGHT_DP: u32 = 56;
const PANEL_TOP_DP: u32 = 48;
const COUNTDOWN_DP: u32 = 120;

/// Region that arms the dismiss zone. Open towards the bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DismissRegion {
    pub top: i32,
    pub left: i32,
    pub right: i32,
}

impl DismissRegion {
    /// Strict hit-test on a widget center
    pub fn contains(&self, center: Point) -> bool {
        center.y > self.top && center.x > self.left && center.x < self.right
    }
}

/// Pixel geometry for every widget on one display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayLayout {
    pub metrics: DisplayMetrics,
    pub control: Rect,
    pub dismiss_widget: Rect,
    pub dismiss_region: DismissRegion,
    pub panel: Rect,
    pub countdown: Rect,
}

impl OverlayLayout {
    pub fn new(metrics: DisplayMetrics) -> Self {
        let width = metrics.width_px();
        let height = metrics.height_px();

        let control_size = metrics.dp(CONTROL_DP);
        let control = Rect::new(
            Point::new(
                width - control_size - metrics.dp(CONTROL_EDGE_MARGIN_DP),
                height / 2,
            ),
            Size::square(control_size),
        );

        let zone_size = metrics.dp(ZONE_WIDGET_DP);
        let dismiss_widget = Rect::new(
            Point::new(
                width / 2 - zone_size / 2,
                height - zone_size - metrics.dp(ZONE_WIDGET_BOTTOM_MARGIN_DP),
            ),
            Size::square(zone_size),
        );

        let dismiss_region = DismissRegion {
            top: height - metrics.dp(ZONE_HIT_HEIGHT_DP),
            left: width / 2 - metrics.dp(ZONE_HIT_HALF_WIDTH_DP),
            right: width / 2 + metrics.dp(ZONE_HIT_HALF_WIDTH_DP),
        };

        let panel_size = Size::new(metrics.dp(PANEL_WIDTH_DP), metrics.dp(PANEL_HEIGHT_DP));
        let panel = Rect::new(
            Point::new((width - panel_size.width) / 2, metrics.dp(PANEL_TOP_DP)),
            panel_size,
        );

        let countdown_size = metrics.dp(COUNTDOWN_DP);
        let countdown = Rect::new(
            Point::new((width - countdown_size) / 2, (height - countdown_size) / 2),
            Size::square(countdown_size),
        );

        Self {
            metrics,
            control,
            dismiss_widget,
            dismiss_region,
            panel,
            countdown,
        }
    }

    /// Would the control, placed at `position`, land on the dismiss zone?
    pub fn control_over_dismiss(&self, position: Point) -> bool {
        let center = Rect::new(position, self.control.size).center();
        self.dismiss_region.contains(center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_at_baseline_density() {
        let layout = OverlayLayout::new(DisplayMetrics::new(400, 800, 160));
        assert_eq!(layout.control.origin, Point::new(400 - 56 - 16, 400));
        assert_eq!(layout.dismiss_widget.origin, Point::new(168, 800 - 64 - 48));
        assert_eq!(
            layout.dismiss_region,
            DismissRegion {
                top: 680,
                left: 140,
                right: 260
            }
        );
        assert_eq!(layout.panel.origin, Point::new(60, 48));
        assert_eq!(layout.countdown.origin, Point::new(140, 340));
    }

    #[test]
    fn test_dismiss_hit_test_is_strict() {
        let layout = OverlayLayout::new(DisplayMetrics::new(400, 800, 160));
        // control is 56px, so its center sits 28px in
        assert!(layout.control_over_dismiss(Point::new(200 - 28, 760)));
        assert!(!layout.control_over_dismiss(Point::new(200 - 28, 680 - 28)));
        assert!(!layout.control_over_dismiss(Point::new(260 - 28, 760)));
        assert!(layout.control_over_dismiss(Point::new(259 - 28, 760)));
    }
}
