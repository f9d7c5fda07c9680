use crate::domain::document::DatasetUrls;
use crate::services::series::{BURNED_SERIES_INDEX, TOTAL_SERIES_INDEX};

/// Half the edge length of the square hit box around a rendered point.
pub const HIT_RADIUS: i32 = 5;

pub const BAR_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelPosition {
    pub x: i32,
    pub y: i32,
}

/// Where a bar of the scope chart landed on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedBar {
    pub index: usize,
    pub top_left: PixelPosition,
    pub bottom_right: PixelPosition,
}

impl RenderedBar {
    pub fn contains(&self, position: PixelPosition) -> bool {
        position.x >= self.top_left.x
            && position.x <= self.bottom_right.x
            && position.y >= self.top_left.y
            && position.y <= self.bottom_right.y
    }
}

/// Where a burn-up data point landed on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedPoint {
    pub series_index: usize,
    pub point_index: usize,
    pub position: PixelPosition,
}

impl RenderedPoint {
    pub fn is_hit_by(&self, click: PixelPosition) -> bool {
        (click.x - self.position.x).abs() <= HIT_RADIUS
            && (click.y - self.position.y).abs() <= HIT_RADIUS
    }
}

/// URL behind a bar of the scope chart: total, burned, velocity.
pub fn resolve_bar_url(bar_index: isize, urls: &[String; BAR_COUNT]) -> Option<&str> {
    let index = usize::try_from(bar_index).ok()?;
    non_empty(urls.get(index)?)
}

pub fn hit_bar(click: PixelPosition, bars: &[RenderedBar]) -> Option<usize> {
    bars.iter().find(|bar| bar.contains(click)).map(|bar| bar.index)
}

/// URLs for every total/burned point under the click. Milestone points and
/// points without a URL resolve to nothing.
pub fn resolve_series_urls<'a>(
    click: PixelPosition,
    rendered_points: &[RenderedPoint],
    urls: &'a DatasetUrls,
) -> Vec<&'a str> {
    rendered_points
        .iter()
        .filter(|point| point.is_hit_by(click))
        .filter_map(|point| point_url(point, urls))
        .collect()
}

/// URL of a rendered point, looked up by series and point index.
pub fn point_url<'a>(point: &RenderedPoint, urls: &'a DatasetUrls) -> Option<&'a str> {
    let table = match point.series_index {
        TOTAL_SERIES_INDEX => &urls.total,
        BURNED_SERIES_INDEX => &urls.burned,
        _ => return None,
    };
    non_empty(table.get(point.point_index)?)
}

fn non_empty(url: &str) -> Option<&str> {
    if url.is_empty() { None } else { Some(url) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: i32, y: i32) -> PixelPosition {
        PixelPosition { x, y }
    }

    fn point(series_index: usize, point_index: usize, x: i32, y: i32) -> RenderedPoint {
        RenderedPoint {
            series_index,
            point_index,
            position: at(x, y),
        }
    }

    fn urls() -> DatasetUrls {
        DatasetUrls {
            total: vec!["t0".to_string(), "t1".to_string()],
            burned: vec!["b0".to_string(), "b1".to_string()],
        }
    }

    #[test]
    fn resolve_bar_url_covers_three_bars_only() {
        let urls = ["total".to_string(), "burned".to_string(), "velocity".to_string()];

        assert_eq!(resolve_bar_url(0, &urls), Some("total"));
        assert_eq!(resolve_bar_url(2, &urls), Some("velocity"));
        assert_eq!(resolve_bar_url(3, &urls), None);
        assert_eq!(resolve_bar_url(-1, &urls), None);
    }

    #[test]
    fn empty_urls_resolve_to_no_action() {
        let urls = [String::new(), "burned".to_string(), String::new()];
        assert_eq!(resolve_bar_url(0, &urls), None);
        assert_eq!(resolve_bar_url(1, &urls), Some("burned"));
    }

    #[test]
    fn hit_bar_finds_the_bar_under_the_click() {
        let bars = vec![
            RenderedBar { index: 0, top_left: at(10, 10), bottom_right: at(30, 100) },
            RenderedBar { index: 1, top_left: at(40, 50), bottom_right: at(60, 100) },
        ];

        assert_eq!(hit_bar(at(45, 99), &bars), Some(1));
        assert_eq!(hit_bar(at(10, 10), &bars), Some(0));
        assert_eq!(hit_bar(at(45, 20), &bars), None);
    }

    #[test]
    fn click_on_total_point_resolves_total_url() {
        let points = vec![point(0, 1, 100, 50), point(1, 1, 100, 200)];
        let urls = urls();

        assert_eq!(resolve_series_urls(at(100, 50), &points, &urls), vec!["t1"]);
        assert_eq!(resolve_series_urls(at(96, 205), &points, &urls), vec!["b1"]);
    }

    #[test]
    fn click_far_from_points_resolves_nothing() {
        let points = vec![point(0, 0, 100, 50)];
        assert!(resolve_series_urls(at(106, 50), &points, &urls()).is_empty());
    }

    #[test]
    fn overlapping_points_resolve_one_url_each() {
        let points = vec![point(0, 0, 20, 20), point(1, 0, 22, 21)];
        assert_eq!(resolve_series_urls(at(21, 20), &points, &urls()), vec!["t0", "b0"]);
    }

    #[test]
    fn milestone_points_and_missing_urls_are_not_resolvable() {
        let points = vec![point(2, 0, 20, 20), point(0, 7, 20, 20)];
        assert!(resolve_series_urls(at(20, 20), &points, &urls()).is_empty());
    }
}
