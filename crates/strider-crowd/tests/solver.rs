use strider_crowd::{
    build_velocity_obstacles, choose_velocity, AgentSnapshot, ConvexObstacle, NeighborKind,
    VelocityObstacle,
};
use strider_nav::Vec2;

fn snapshot(position: Vec2, radius: f32) -> AgentSnapshot {
    AgentSnapshot {
        position,
        radius,
        velocity: Vec2::ZERO,
        pref_velocity: Vec2::ZERO,
    }
}

fn wall_hull() -> ConvexObstacle {
    ConvexObstacle::new(vec![
        Vec2::new(2.0, -1.0),
        Vec2::new(3.0, -1.0),
        Vec2::new(3.0, 1.0),
        Vec2::new(2.0, 1.0),
    ])
}

#[test]
fn unobstructed_choice_is_the_preferred_velocity() {
    let pref = Vec2::new(1.0, 0.5);
    let v = choose_velocity(pref, 4.0, &[]);
    assert_eq!(v, pref);
}

#[test]
fn preferred_velocity_is_capped_to_max_speed() {
    let v = choose_velocity(Vec2::new(10.0, 0.0), 2.0, &[]);
    assert!((v.length() - 2.0).abs() < 1e-5);
    assert!(v.x > 0.0 && v.y == 0.0);
}

#[test]
fn static_circle_cone_has_zero_apex_and_tangent_sides() {
    let agent = snapshot(Vec2::ZERO, 0.5);
    let mut vos = Vec::new();
    build_velocity_obstacles(
        agent,
        [NeighborKind::StaticCircle {
            center: Vec2::new(5.0, 0.0),
            radius: 1.0,
        }]
        .into_iter(),
        &mut vos,
    );

    assert_eq!(vos.len(), 1);
    let vo = vos[0];
    assert_eq!(vo.apex, Vec2::ZERO);
    // Straight at the neighbor is blocked, the perpendicular is not.
    assert!(vo.contains(Vec2::new(1.0, 0.0)));
    assert!(!vo.contains(Vec2::new(0.0, 1.0)));
    // Opening angle matches asin((r + r') / dist) on both sides.
    let opening = (1.5_f32 / 5.0).asin();
    assert!((vo.side1.angle() + opening).abs() < 1e-5);
    assert!((vo.side2.angle() - opening).abs() < 1e-5);
}

#[test]
fn overlapping_neighbors_yield_a_half_plane() {
    let agent = snapshot(Vec2::ZERO, 0.5);
    let mut vos = Vec::new();
    build_velocity_obstacles(
        agent,
        [NeighborKind::MobileCircle {
            center: Vec2::new(0.5, 0.0),
            radius: 0.5,
            velocity: Vec2::ZERO,
            pref_velocity: Vec2::new(-1.0, 0.0),
        }]
        .into_iter(),
        &mut vos,
    );

    assert_eq!(vos.len(), 1);
    let vo = vos[0];
    assert!((vo.side1 + vo.side2).length() < 1e-6);

    // Any motion toward the overlapped neighbor is forbidden.
    let v = choose_velocity(Vec2::new(1.0, 0.0), 1.0, &vos);
    assert!(v.x <= 1e-5, "selected {v:?}");
}

#[test]
fn hrvo_branches_break_head_on_symmetry() {
    // Two identical agents approaching head-on along x with equal and
    // opposite preferences: `det(dp, dpref)` is exactly zero, so each takes
    // the else-branch of the apex rule, and the side enumeration order
    // sends one below and one above the axis.
    let mut vos = Vec::new();

    let a = AgentSnapshot {
        position: Vec2::ZERO,
        radius: 0.5,
        velocity: Vec2::ZERO,
        pref_velocity: Vec2::new(1.0, 0.0),
    };
    build_velocity_obstacles(
        a,
        [NeighborKind::MobileCircle {
            center: Vec2::new(10.0, 0.0),
            radius: 0.5,
            velocity: Vec2::ZERO,
            pref_velocity: Vec2::new(-1.0, 0.0),
        }]
        .into_iter(),
        &mut vos,
    );
    let va = choose_velocity(a.pref_velocity, 1.0, &vos);

    let b = AgentSnapshot {
        position: Vec2::new(10.0, 0.0),
        radius: 0.5,
        velocity: Vec2::ZERO,
        pref_velocity: Vec2::new(-1.0, 0.0),
    };
    build_velocity_obstacles(
        b,
        [NeighborKind::MobileCircle {
            center: Vec2::ZERO,
            radius: 0.5,
            velocity: Vec2::ZERO,
            pref_velocity: Vec2::new(1.0, 0.0),
        }]
        .into_iter(),
        &mut vos,
    );
    let vb = choose_velocity(b.pref_velocity, 1.0, &vos);

    assert!(va.y < 0.0, "agent a veers one way: {va:?}");
    assert!(vb.y > 0.0, "agent b veers the other: {vb:?}");
}

#[test]
fn hrvo_apex_shifts_with_the_passing_side() {
    // An offset crossing: the sign of det(dp, dpref) now picks a branch,
    // and the apex moves off the neighbor's velocity.
    let a = AgentSnapshot {
        position: Vec2::ZERO,
        radius: 0.5,
        velocity: Vec2::new(1.0, 0.0),
        pref_velocity: Vec2::new(1.0, 0.0),
    };
    let mut vos = Vec::new();
    build_velocity_obstacles(
        a,
        [NeighborKind::MobileCircle {
            center: Vec2::new(6.0, 2.0),
            radius: 0.5,
            velocity: Vec2::new(-1.0, 0.0),
            pref_velocity: Vec2::new(-1.0, 0.2),
        }]
        .into_iter(),
        &mut vos,
    );

    assert_eq!(vos.len(), 1);
    let vo = vos[0];
    assert!(
        vo.apex.distance(Vec2::new(-1.0, 0.0)) > 1e-3,
        "apex must not sit on the neighbor's velocity: {:?}",
        vo.apex
    );
}

#[test]
fn convex_hull_produces_a_cone_from_afar() {
    let hull = wall_hull();
    let agent = snapshot(Vec2::ZERO, 0.25);
    let mut vos = Vec::new();
    build_velocity_obstacles(agent, [NeighborKind::Convex(&hull)].into_iter(), &mut vos);
    assert_eq!(vos.len(), 1);
    let vo = vos[0];
    assert_eq!(vo.apex, Vec2::ZERO);
    assert!(vo.side1.det(vo.side2) > 0.0);
    assert!(vo.contains(Vec2::new(1.0, 0.0)));
}

#[test]
fn collapsed_convex_silhouette_is_discarded() {
    // Close to the wall (but still outside the inflated hull) the clearance
    // offsets push the silhouette span past a half turn; the inverted cone
    // is dropped rather than misread as free space.
    let hull = wall_hull();
    let agent = snapshot(Vec2::new(1.8, 0.0), 0.25);
    let mut vos = Vec::new();
    build_velocity_obstacles(agent, [NeighborKind::Convex(&hull)].into_iter(), &mut vos);
    assert!(vos.is_empty());
}

#[test]
fn blocked_agent_halts() {
    // Four half-planes leaving no feasible direction.
    let wall = |dir: Vec2| VelocityObstacle {
        apex: Vec2::ZERO,
        side1: dir,
        side2: -dir,
    };
    let vos = [
        wall(Vec2::new(0.0, 1.0)),
        wall(Vec2::new(1.0, 0.0)),
        wall(Vec2::new(0.0, -1.0)),
        wall(Vec2::new(-1.0, 0.0)),
    ];
    let v = choose_velocity(Vec2::new(1.0, 0.0), 1.0, &vos);
    assert_eq!(v, Vec2::ZERO);
}

#[test]
fn pair_intersections_are_order_invariant() {
    // Two overlapping cones: the unordered pair enumeration with all four
    // side combinations must yield the same selection either way round.
    let vo_a = VelocityObstacle {
        apex: Vec2::new(0.0, 0.0),
        side1: Vec2::new(1.0, -0.2).normalize(),
        side2: Vec2::new(0.2, 1.0).normalize(),
    };
    let vo_b = VelocityObstacle {
        apex: Vec2::new(0.0, -0.5),
        side1: Vec2::new(1.0, 0.0).normalize(),
        side2: Vec2::new(0.0, 1.0).normalize(),
    };
    let pref = Vec2::new(1.5, 0.5);

    let forward = choose_velocity(pref, 4.0, &[vo_a, vo_b]);
    let reversed = choose_velocity(pref, 4.0, &[vo_b, vo_a]);
    assert!(forward.distance(reversed) < 1e-5);
    // The selection is on neither interior.
    assert!(!vo_a.contains(forward) && !vo_b.contains(forward));
}
