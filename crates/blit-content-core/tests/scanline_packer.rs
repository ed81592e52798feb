use blit_content_core::model::Rect;
use blit_content_core::packer::{Packer, ScanlinePacker};
use rand::{Rng, SeedableRng};

fn disjoint(rects: &[Rect]) -> bool {
    for i in 0..rects.len() {
        for j in (i + 1)..rects.len() {
            if rects[i].intersects(&rects[j]) {
                return false;
            }
        }
    }
    true
}

fn random_sizes(seed: u64, count: usize, max: u32) -> Vec<(u32, u32)> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| (rng.gen_range(1..=max), rng.gen_range(1..=max)))
        .collect()
}

fn pack_all(w: u32, h: u32, sizes: &[(u32, u32)]) -> Vec<Rect> {
    let mut p = ScanlinePacker::new(w, h).unwrap();
    sizes
        .iter()
        .filter_map(|&(sw, sh)| p.pack(&Rect::new(0, 0, sw, sh)))
        .collect()
}

/// Recounts every cell's run from scratch and compares with the packer.
fn check_runs(p: &ScanlinePacker, placed: &[Rect]) {
    for y in 0..p.height() {
        let state: Vec<bool> = (0..p.width())
            .map(|x| placed.iter().any(|r| r.contains(&Rect::new(x, y, 1, 1))))
            .collect();
        for x in 0..p.width() as usize {
            let expect_run = state[x..].iter().take_while(|&&s| s == state[x]).count() as u32;
            assert_eq!(
                p.run_at(x as u32, y),
                (state[x], expect_run),
                "cell ({x}, {y})"
            );
        }
    }
}

#[test]
fn random_placements_are_disjoint_and_in_bounds() {
    for seed in [1u64, 7, 42, 2024] {
        let sizes = random_sizes(seed, 120, 48);
        let placed = pack_all(256, 256, &sizes);
        assert!(!placed.is_empty());
        assert!(disjoint(&placed), "seed {seed}");
        let sheet = Rect::new(0, 0, 256, 256);
        assert!(placed.iter().all(|r| sheet.contains(r)));
    }
}

#[test]
fn same_input_same_layout() {
    let sizes = random_sizes(99, 80, 40);
    assert_eq!(pack_all(200, 200, &sizes), pack_all(200, 200, &sizes));
}

#[test]
fn run_lengths_match_a_full_recount() {
    let sizes = random_sizes(0xDEADBEEF, 40, 12);
    let mut p = ScanlinePacker::new(48, 40).unwrap();
    let mut placed = Vec::new();
    for (w, h) in sizes {
        if let Some(r) = p.pack(&Rect::new(0, 0, w, h)) {
            placed.push(r);
            check_runs(&p, &placed);
        }
    }
    assert!(placed.len() > 5);
}

#[test]
fn four_quadrants_fill_the_sheet_exactly() {
    let placed = pack_all(128, 128, &[(64, 64); 4]);
    assert_eq!(
        placed,
        vec![
            Rect::new(0, 0, 64, 64),
            Rect::new(64, 0, 64, 64),
            Rect::new(0, 64, 64, 64),
            Rect::new(64, 64, 64, 64),
        ]
    );
    let mut p = ScanlinePacker::new(128, 128).unwrap();
    for r in &placed {
        p.pack(r).unwrap();
    }
    assert!(p.pack(&Rect::new(0, 0, 1, 1)).is_none());
}

#[test]
fn first_fit_prefers_the_topmost_row() {
    let mut p = ScanlinePacker::new(100, 100).unwrap();
    p.pack(&Rect::new(0, 0, 60, 10)).unwrap();
    // 40 columns remain on row 0; a 30-wide sprite goes there, not below.
    assert_eq!(p.pack(&Rect::new(0, 0, 30, 20)), Some(Rect::new(60, 0, 30, 20)));
    // 50 wide cannot fit beside, so it drops to the first row with room.
    assert_eq!(p.pack(&Rect::new(0, 0, 50, 5)), Some(Rect::new(0, 10, 50, 5)));
}

#[test]
fn oversized_and_degenerate_requests_fail() {
    let mut p = ScanlinePacker::new(64, 64).unwrap();
    assert!(!p.can_pack(&Rect::new(0, 0, 65, 1)));
    assert!(!p.can_pack(&Rect::new(0, 0, 0, 4)));
    assert!(p.pack(&Rect::new(0, 0, 1, 65)).is_none());
    p.reset();
    assert_eq!(p.run_at(0, 0), (false, 64));
}
