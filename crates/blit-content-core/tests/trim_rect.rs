use blit_content_core::model::Rect;
use blit_content_core::trim::compute_trim_rect;
use rand::{Rng, SeedableRng};

fn random_sprite(rng: &mut rand::rngs::StdRng, w: u32, h: u32) -> Vec<u8> {
    let mut px = vec![0u8; (w * h * 4) as usize];
    let blobs = rng.gen_range(0..4);
    for _ in 0..blobs {
        let (x, y) = (rng.gen_range(0..w), rng.gen_range(0..h));
        px[((y * w + x) * 4 + 3) as usize] = rng.gen_range(1..=255);
    }
    px
}

#[test]
fn trimming_a_trimmed_rect_changes_nothing() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    for _ in 0..200 {
        let (w, h) = (rng.gen_range(1..24), rng.gen_range(1..24));
        let px = random_sprite(&mut rng, w, h);
        let full = Rect::new(0, 0, w, h);
        match compute_trim_rect(&px, w, full, 0) {
            Some(r) => {
                assert!(full.contains(&r));
                assert_eq!(compute_trim_rect(&px, w, r, 0), Some(r));
            }
            None => assert!(px.chunks(4).all(|p| p[3] == 0)),
        }
    }
}

#[test]
fn threshold_treats_faint_pixels_as_transparent() {
    let mut px = vec![0u8; 4 * 4 * 4];
    px[(5 * 4) + 3] = 10; // (1, 1) faint
    px[(10 * 4) + 3] = 200; // (2, 2) solid
    let full = Rect::new(0, 0, 4, 4);
    assert_eq!(compute_trim_rect(&px, 4, full, 0), Some(Rect::new(1, 1, 2, 2)));
    assert_eq!(compute_trim_rect(&px, 4, full, 10), Some(Rect::new(2, 2, 1, 1)));
}

#[test]
fn empty_region_is_none() {
    let px = vec![255u8; 16];
    assert_eq!(compute_trim_rect(&px, 2, Rect::new(0, 0, 0, 2), 0), None);
}
