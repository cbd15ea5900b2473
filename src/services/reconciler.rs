use crate::config::{ReconcilerTuning, StateStore};
use crate::models::Rule;
use crate::shell::{Point, Rect, Size, WindowInfo, WindowSystem};
use crate::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// Coordinates further out than this are window-manager churn artifacts and
/// never persisted.
const SANE_COORD_LIMIT: i32 = 20_000;

/// Geometry and state flags captured synchronously at event time. The window
/// may move again before a debounce timer fires; persisting works from this
/// capture, never from a later query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateCapture {
    pub frame: Rect,
    pub maximized: bool,
    pub minimized: bool,
    pub above: bool,
    pub sticky: bool,
    pub workspace: i32,
}

impl StateCapture {
    pub fn of(window: &WindowInfo) -> Self {
        Self {
            frame: window.frame,
            maximized: window.is_maximized,
            minimized: window.is_minimized,
            above: window.is_above,
            sticky: window.is_sticky,
            workspace: window.workspace,
        }
    }
}

/// Result of a restoration attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Restoration ran to completion; the caller still owes a deferred
    /// workspace activation when the index is present
    Applied { workspace_switch: Option<i32> },
    /// The window or its work area vanished mid-computation; nothing was
    /// applied and the next natural event will re-attempt
    Skipped,
}

/// Counters for reconciliation operations
#[derive(Debug, Default, Clone)]
pub struct ReconcilerMetrics {
    pub restores_applied: u64,
    pub restores_skipped: u64,
    pub centered_fallbacks: u64,
    pub snapshots_written: u64,
    pub snapshots_unchanged: u64,
}

/// Computes and applies target geometry/state for tracked windows.
///
/// Stateless given its inputs: a rule, the persisted per-class state, the
/// current work area and the sibling windows fully determine the outcome.
pub struct Reconciler {
    system: Arc<dyn WindowSystem>,
    states: Arc<StateStore>,
    tuning: ReconcilerTuning,
    metrics: Arc<RwLock<ReconcilerMetrics>>,
}

impl Reconciler {
    pub fn new(
        system: Arc<dyn WindowSystem>,
        states: Arc<StateStore>,
        tuning: ReconcilerTuning,
    ) -> Self {
        Self {
            system,
            states,
            tuning,
            metrics: Arc::new(RwLock::new(ReconcilerMetrics::default())),
        }
    }

    pub fn tuning(&self) -> &ReconcilerTuning {
        &self.tuning
    }

    /// Apply the saved state for `class_id` to a window under `rule`.
    ///
    /// Idempotence per session is guaranteed by the caller's
    /// `restore_applied` gate, not by re-running this procedure.
    pub async fn apply_saved_state(
        &self,
        window_id: u64,
        class_id: &str,
        rule: &Rule,
    ) -> Result<RestoreOutcome> {
        let Some(window) = self.system.window(window_id)? else {
            self.metrics.write().await.restores_skipped += 1;
            return Ok(RestoreOutcome::Skipped);
        };

        if !rule.any_axis_enabled() {
            let centered = self.center_window(window_id).await?;
            return Ok(if centered {
                RestoreOutcome::Applied {
                    workspace_switch: None,
                }
            } else {
                RestoreOutcome::Skipped
            });
        }

        let Some(area) = self.system.work_area(window_id)? else {
            self.metrics.write().await.restores_skipped += 1;
            return Ok(RestoreOutcome::Skipped);
        };

        let saved = self.states.get(class_id).unwrap_or_default();

        // Target size: current frame unless a sane saved size is enabled
        let mut size = window.frame.size;
        if rule.restore_size {
            if let Some((width, height)) = saved.size() {
                if width > self.tuning.min_sane_size && height > self.tuning.min_sane_size {
                    size = Size::new(width, height);
                }
            }
        }

        // Target position: centered default, saved position when it is still
        // plausibly on screen
        let mut origin = centered_origin(area, size);
        if rule.restore_position {
            if let Some((x, y)) = saved.position() {
                if area.contains_with_tolerance(x, y, self.tuning.work_area_tolerance) {
                    origin = Point::new(x, y);
                } else {
                    debug!(
                        class = class_id,
                        x, y, "Saved position outside work area, centering instead"
                    );
                }
            }
        }

        let siblings = self.sibling_origins(window_id, class_id)?;
        origin = resolve_collisions(origin, &siblings, &self.tuning);
        origin = clamp_to_area(origin, size, area, self.tuning.edge_margin);
        let target = Rect { origin, size };

        if window.is_maximized && !rule.restore_maximized {
            // The window manager maximized it and the rule has no opinion;
            // leave both the flag and the geometry alone
            trace!(window = window_id, "Window is maximized, geometry untouched");
        } else {
            if window.is_maximized {
                self.system.set_maximized(window_id, false)?;
            }
            self.system.move_resize(window_id, target)?;
        }

        let mut workspace_switch = None;
        if rule.restore_workspace {
            if let Some(index) = saved.workspace_index() {
                if index < self.system.workspace_count()? {
                    self.system.move_to_workspace(window_id, index)?;
                    if rule.switch_to_workspace && self.system.active_workspace()? != index {
                        workspace_switch = Some(index);
                    }
                }
            }
        }

        // Flag order matters: maximized goes last so the geometry step above
        // cannot undo it
        if rule.restore_sticky {
            if let Some(sticky) = saved.sticky {
                self.system.set_sticky(window_id, sticky)?;
            }
        }
        if rule.restore_above {
            if let Some(above) = saved.above {
                self.system.set_above(window_id, above)?;
            }
        }
        if rule.restore_minimized {
            if let Some(minimized) = saved.minimized {
                self.system.set_minimized(window_id, minimized)?;
            }
        }
        if rule.restore_maximized && saved.maximized == Some(true) {
            self.system.set_maximized(window_id, true)?;
        }

        self.metrics.write().await.restores_applied += 1;
        debug!(window = window_id, class = class_id, ?target, "Restored window state");
        Ok(RestoreOutcome::Applied { workspace_switch })
    }

    /// Merge a captured snapshot into the persisted entry for `class_id`,
    /// honoring the rule's per-axis flags. Returns whether the store changed.
    pub async fn snapshot(
        &self,
        rule: &Rule,
        class_id: &str,
        capture: &StateCapture,
    ) -> Result<bool> {
        let min_size = self.tuning.min_sane_size;
        let changed = self.states.merge(class_id, |entry| {
            if capture.maximized {
                // A maximized frame is the work area, not the user's layout;
                // keep the restored geometry underneath intact
                if rule.restore_maximized {
                    entry.maximized = Some(true);
                }
            } else {
                if rule.restore_maximized {
                    entry.maximized = Some(false);
                }
                if rule.restore_size {
                    let Size { width, height } = capture.frame.size;
                    if width > min_size && height > min_size {
                        entry.width = Some(width);
                        entry.height = Some(height);
                    }
                }
                if rule.restore_position {
                    let Point { x, y } = capture.frame.origin;
                    if x.abs() <= SANE_COORD_LIMIT && y.abs() <= SANE_COORD_LIMIT {
                        entry.x = Some(x);
                        entry.y = Some(y);
                    }
                }
            }

            if rule.restore_workspace {
                entry.workspace = Some(capture.workspace);
            }
            if rule.restore_minimized {
                entry.minimized = Some(capture.minimized);
            }
            if rule.restore_above {
                entry.above = Some(capture.above);
            }
            if rule.restore_sticky {
                entry.sticky = Some(capture.sticky);
            }
        })?;

        let mut metrics = self.metrics.write().await;
        if changed {
            metrics.snapshots_written += 1;
        } else {
            metrics.snapshots_unchanged += 1;
        }
        Ok(changed)
    }

    /// Center the window on its current work area. Returns `false` (not an
    /// error) when the window or its workspace is already gone.
    pub async fn center_window(&self, window_id: u64) -> Result<bool> {
        let Some(window) = self.system.window(window_id)? else {
            self.metrics.write().await.restores_skipped += 1;
            return Ok(false);
        };
        let Some(area) = self.system.work_area(window_id)? else {
            self.metrics.write().await.restores_skipped += 1;
            return Ok(false);
        };

        let origin = centered_origin(area, window.frame.size);
        self.system.move_resize(
            window_id,
            Rect {
                origin,
                size: window.frame.size,
            },
        )?;

        self.metrics.write().await.centered_fallbacks += 1;
        Ok(true)
    }

    pub async fn metrics(&self) -> ReconcilerMetrics {
        self.metrics.read().await.clone()
    }

    /// Top-left corners of visible, non-minimized windows of the same class
    fn sibling_origins(&self, window_id: u64, class_id: &str) -> Result<Vec<Point>> {
        let origins = self
            .system
            .list_windows()?
            .into_iter()
            .filter(|window| {
                window.window_id != window_id
                    && window.wm_class.as_deref() == Some(class_id)
                    && window.is_mapped
                    && !window.is_minimized
            })
            .map(|window| window.frame.origin)
            .collect();
        Ok(origins)
    }
}

/// Origin that aligns the frame center with the work-area center
pub fn centered_origin(area: Rect, size: Size) -> Point {
    Point::new(
        area.origin.x + (area.size.width - size.width) / 2,
        area.origin.y + (area.size.height - size.height) / 2,
    )
}

/// Step the target diagonally away from occupied same-class positions.
/// Candidates are not re-clamped during iteration; the caller clamps the
/// final position once.
pub fn resolve_collisions(target: Point, siblings: &[Point], tuning: &ReconcilerTuning) -> Point {
    let mut candidate = target;
    for _ in 0..tuning.max_collision_attempts {
        let colliding = siblings.iter().any(|occupied| {
            (occupied.x - candidate.x).abs() < tuning.collision_tolerance
                && (occupied.y - candidate.y).abs() < tuning.collision_tolerance
        });
        if !colliding {
            break;
        }
        candidate.x += tuning.collision_step;
        candidate.y += tuning.collision_step;
    }
    candidate
}

/// Keep at least `margin` of the frame (including the title-bar edge) inside
/// the work area.
pub fn clamp_to_area(origin: Point, size: Size, area: Rect, margin: i32) -> Point {
    Point::new(
        clamp_axis(
            origin.x,
            area.origin.x + margin - size.width,
            area.right() - margin,
        ),
        clamp_axis(origin.y, area.origin.y, area.bottom() - margin),
    )
}

fn clamp_axis(value: i32, min: i32, max: i32) -> i32 {
    if max < min {
        min
    } else {
        value.clamp(min, max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings_store::{InMemorySettingsStore, SettingsStore};
    use crate::models::SavedState;
    use crate::shell::{test_window, InMemoryWindowSystem};

    struct Fixture {
        system: Arc<InMemoryWindowSystem>,
        states: Arc<StateStore>,
        reconciler: Reconciler,
    }

    fn fixture() -> Fixture {
        let system = Arc::new(InMemoryWindowSystem::default());
        let store = Arc::new(InMemorySettingsStore::new()) as Arc<dyn SettingsStore>;
        let states = Arc::new(StateStore::new(store));
        let reconciler = Reconciler::new(
            system.clone(),
            states.clone(),
            ReconcilerTuning::default(),
        );
        Fixture {
            system,
            states,
            reconciler,
        }
    }

    fn seed_state(fixture: &Fixture, class_id: &str, state: SavedState) {
        fixture
            .states
            .merge(class_id, |entry| *entry = state)
            .unwrap();
    }

    fn restore_rule() -> Rule {
        Rule {
            class_pattern: "editor".to_string(),
            restore_size: true,
            restore_position: true,
            ..Rule::default()
        }
    }

    #[tokio::test]
    async fn saved_geometry_round_trips_exactly() {
        let fx = fixture();
        fx.system
            .insert_window(test_window(1, "editor", Rect::new(0, 0, 640, 480)));
        seed_state(
            &fx,
            "editor",
            SavedState {
                x: Some(100),
                y: Some(100),
                width: Some(800),
                height: Some(600),
                ..SavedState::default()
            },
        );

        let outcome = fx
            .reconciler
            .apply_saved_state(1, "editor", &restore_rule())
            .await
            .unwrap();

        assert!(matches!(outcome, RestoreOutcome::Applied { .. }));
        let window = fx.system.window(1).unwrap().unwrap();
        assert_eq!(window.frame, Rect::new(100, 100, 800, 600));
    }

    #[tokio::test]
    async fn no_axes_enabled_centers_the_window() {
        let fx = fixture();
        fx.system
            .insert_window(test_window(1, "editor", Rect::new(0, 0, 800, 600)));

        let rule = Rule::for_class("editor");
        let outcome = fx
            .reconciler
            .apply_saved_state(1, "editor", &rule)
            .await
            .unwrap();

        assert!(matches!(outcome, RestoreOutcome::Applied { .. }));
        let window = fx.system.window(1).unwrap().unwrap();
        assert_eq!(window.frame.origin, Point::new(560, 240));
    }

    #[tokio::test]
    async fn out_of_bounds_saved_position_falls_back_to_center() {
        let fx = fixture();
        fx.system
            .insert_window(test_window(1, "editor", Rect::new(0, 0, 800, 600)));
        seed_state(
            &fx,
            "editor",
            SavedState {
                x: Some(-5000),
                y: Some(100),
                ..SavedState::default()
            },
        );

        let rule = Rule {
            restore_position: true,
            ..Rule::for_class("editor")
        };
        fx.reconciler
            .apply_saved_state(1, "editor", &rule)
            .await
            .unwrap();

        let window = fx.system.window(1).unwrap().unwrap();
        assert_eq!(window.frame.origin, Point::new(560, 240));
    }

    #[tokio::test]
    async fn colliding_sibling_offsets_the_target_diagonally() {
        let fx = fixture();
        fx.system
            .insert_window(test_window(1, "editor", Rect::new(560, 400, 800, 600)));
        fx.system
            .insert_window(test_window(2, "editor", Rect::new(0, 0, 800, 600)));
        seed_state(
            &fx,
            "editor",
            SavedState {
                x: Some(560),
                y: Some(400),
                width: Some(800),
                height: Some(600),
                ..SavedState::default()
            },
        );

        fx.reconciler
            .apply_saved_state(2, "editor", &restore_rule())
            .await
            .unwrap();

        let window = fx.system.window(2).unwrap().unwrap();
        assert_eq!(window.frame.origin, Point::new(610, 450));
    }

    #[tokio::test]
    async fn minimized_siblings_do_not_collide() {
        let fx = fixture();
        let mut sibling = test_window(1, "editor", Rect::new(560, 400, 800, 600));
        sibling.is_minimized = true;
        fx.system.insert_window(sibling);
        fx.system
            .insert_window(test_window(2, "editor", Rect::new(0, 0, 800, 600)));
        seed_state(
            &fx,
            "editor",
            SavedState {
                x: Some(560),
                y: Some(400),
                ..SavedState::default()
            },
        );

        let rule = Rule {
            restore_position: true,
            ..Rule::for_class("editor")
        };
        fx.reconciler
            .apply_saved_state(2, "editor", &rule)
            .await
            .unwrap();

        let window = fx.system.window(2).unwrap().unwrap();
        assert_eq!(window.frame.origin, Point::new(560, 400));
    }

    #[tokio::test]
    async fn maximized_window_is_left_alone_without_the_flag() {
        let fx = fixture();
        fx.system
            .insert_window(test_window(1, "editor", Rect::new(0, 0, 800, 600)));
        fx.system.set_maximized(1, true).unwrap();
        seed_state(
            &fx,
            "editor",
            SavedState {
                x: Some(100),
                y: Some(100),
                width: Some(800),
                height: Some(600),
                ..SavedState::default()
            },
        );

        fx.reconciler
            .apply_saved_state(1, "editor", &restore_rule())
            .await
            .unwrap();

        let window = fx.system.window(1).unwrap().unwrap();
        assert!(window.is_maximized);
        assert_eq!(window.frame, Rect::new(0, 0, 1920, 1080));
    }

    #[tokio::test]
    async fn saved_maximized_is_applied_after_geometry() {
        let fx = fixture();
        fx.system
            .insert_window(test_window(1, "editor", Rect::new(0, 0, 800, 600)));
        seed_state(
            &fx,
            "editor",
            SavedState {
                x: Some(100),
                y: Some(100),
                width: Some(800),
                height: Some(600),
                maximized: Some(true),
                ..SavedState::default()
            },
        );

        let rule = Rule {
            restore_maximized: true,
            ..restore_rule()
        };
        fx.reconciler
            .apply_saved_state(1, "editor", &rule)
            .await
            .unwrap();

        let window = fx.system.window(1).unwrap().unwrap();
        assert!(window.is_maximized);
    }

    #[tokio::test]
    async fn workspace_restore_reports_pending_switch() {
        let fx = fixture();
        fx.system
            .insert_window(test_window(1, "editor", Rect::new(0, 0, 800, 600)));
        seed_state(
            &fx,
            "editor",
            SavedState {
                workspace: Some(2),
                ..SavedState::default()
            },
        );

        let rule = Rule {
            restore_workspace: true,
            switch_to_workspace: true,
            ..Rule::for_class("editor")
        };
        let outcome = fx
            .reconciler
            .apply_saved_state(1, "editor", &rule)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RestoreOutcome::Applied {
                workspace_switch: Some(2)
            }
        );
        let window = fx.system.window(1).unwrap().unwrap();
        assert_eq!(window.workspace, 2);
        // Activation itself is deferred to the session timer
        assert!(fx.system.recorded_activations().is_empty());
    }

    #[tokio::test]
    async fn invalid_saved_workspace_is_ignored() {
        let fx = fixture();
        fx.system
            .insert_window(test_window(1, "editor", Rect::new(0, 0, 800, 600)));
        seed_state(
            &fx,
            "editor",
            SavedState {
                workspace: Some(99),
                ..SavedState::default()
            },
        );

        let rule = Rule {
            restore_workspace: true,
            ..Rule::for_class("editor")
        };
        let outcome = fx
            .reconciler
            .apply_saved_state(1, "editor", &rule)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            RestoreOutcome::Applied {
                workspace_switch: None
            }
        );
        assert_eq!(fx.system.window(1).unwrap().unwrap().workspace, 0);
    }

    #[tokio::test]
    async fn vanished_window_skips_the_attempt() {
        let fx = fixture();
        let outcome = fx
            .reconciler
            .apply_saved_state(42, "editor", &restore_rule())
            .await
            .unwrap();
        assert_eq!(outcome, RestoreOutcome::Skipped);
    }

    #[tokio::test]
    async fn snapshot_while_maximized_writes_only_the_flag() {
        let fx = fixture();
        let rule = Rule {
            restore_maximized: true,
            ..restore_rule()
        };
        let capture = StateCapture {
            frame: Rect::new(0, 0, 1920, 1080),
            maximized: true,
            minimized: false,
            above: false,
            sticky: false,
            workspace: 0,
        };

        assert!(fx.reconciler.snapshot(&rule, "editor", &capture).await.unwrap());

        let entry = fx.states.get("editor").unwrap();
        assert_eq!(entry.maximized, Some(true));
        assert_eq!(entry.width, None);
        assert_eq!(entry.height, None);
        assert_eq!(entry.x, None);
        assert_eq!(entry.y, None);
    }

    #[tokio::test]
    async fn snapshot_while_unmaximized_writes_geometry_and_flag() {
        let fx = fixture();
        let rule = Rule {
            restore_maximized: true,
            ..restore_rule()
        };
        let capture = StateCapture {
            frame: Rect::new(100, 100, 800, 600),
            maximized: false,
            minimized: false,
            above: false,
            sticky: false,
            workspace: 1,
        };

        fx.reconciler.snapshot(&rule, "editor", &capture).await.unwrap();

        let entry = fx.states.get("editor").unwrap();
        assert_eq!(entry.maximized, Some(false));
        assert_eq!(entry.position(), Some((100, 100)));
        assert_eq!(entry.size(), Some((800, 600)));
        // Workspace flag is off in the rule, so nothing was recorded
        assert_eq!(entry.workspace, None);
    }

    #[tokio::test]
    async fn snapshot_rejects_tiny_and_absurd_geometry() {
        let fx = fixture();
        let capture = StateCapture {
            frame: Rect::new(-30_000, 100, 40, 40),
            maximized: false,
            minimized: false,
            above: false,
            sticky: false,
            workspace: 0,
        };

        let changed = fx
            .reconciler
            .snapshot(&restore_rule(), "editor", &capture)
            .await
            .unwrap();

        assert!(!changed);
        assert!(fx.states.get("editor").is_none());
    }

    #[tokio::test]
    async fn repeated_identical_snapshot_writes_once() {
        let fx = fixture();
        let capture = StateCapture {
            frame: Rect::new(100, 100, 800, 600),
            maximized: false,
            minimized: false,
            above: false,
            sticky: false,
            workspace: 0,
        };

        assert!(fx
            .reconciler
            .snapshot(&restore_rule(), "editor", &capture)
            .await
            .unwrap());
        assert!(!fx
            .reconciler
            .snapshot(&restore_rule(), "editor", &capture)
            .await
            .unwrap());

        let metrics = fx.reconciler.metrics().await;
        assert_eq!(metrics.snapshots_written, 1);
        assert_eq!(metrics.snapshots_unchanged, 1);
    }

    #[test]
    fn centered_origin_math() {
        let area = Rect::new(0, 0, 1920, 1080);
        let origin = centered_origin(area, Size::new(800, 600));
        assert_eq!(origin, Point::new(560, 240));
    }

    #[test]
    fn collision_resolution_stops_at_first_free_slot() {
        let tuning = ReconcilerTuning::default();
        let siblings = vec![Point::new(560, 400), Point::new(610, 450)];

        let resolved = resolve_collisions(Point::new(560, 400), &siblings, &tuning);
        assert_eq!(resolved, Point::new(660, 500));
    }

    #[test]
    fn collision_resolution_gives_up_after_max_attempts() {
        let tuning = ReconcilerTuning {
            max_collision_attempts: 3,
            ..ReconcilerTuning::default()
        };
        // Fully occupied diagonal: every candidate collides
        let siblings: Vec<Point> = (0..10)
            .map(|step| Point::new(step * 50, step * 50))
            .collect();

        let resolved = resolve_collisions(Point::new(0, 0), &siblings, &tuning);
        assert_eq!(resolved, Point::new(150, 150));
    }

    #[test]
    fn clamp_keeps_a_visible_margin() {
        let area = Rect::new(0, 0, 1920, 1080);
        let size = Size::new(800, 600);

        let clamped = clamp_to_area(Point::new(5000, -300), size, area, 50);
        assert_eq!(clamped, Point::new(1870, 0));

        let clamped = clamp_to_area(Point::new(-5000, 2000), size, area, 50);
        assert_eq!(clamped, Point::new(-750, 1030));
    }
}
