//! End-to-end exercise of the snapshot-diff path over real files: archives
//! expand into scratch trees, trees diff into a report, and the report
//! upholds its ordering and totals.

use flate2::Compression;
use flate2::write::GzEncoder;
use image::{ImageFormat, Rgba, RgbaImage};
use pixophilic::application::diff::diff_trees;
use pixophilic::application::lockfile::{Resolution, resolve_update_commits};
use pixophilic::application::materialize::SnapshotTree;
use pixophilic::infra::archive::unpack_tgz;

fn png(width: u32, height: u32, painter: impl Fn(u32, u32) -> Rgba<u8>) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, painter);
    let mut bytes = std::io::Cursor::new(Vec::new());
    img.write_to(&mut bytes, ImageFormat::Png).unwrap();
    bytes.into_inner()
}

fn tgz(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, path, *contents).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

#[tokio::test]
async fn archives_expand_diff_and_report() {
    let scratch = tempfile::tempdir().unwrap();
    let base_dir = scratch.path().join("base");
    let current_dir = scratch.path().join("current");
    let output_dir = scratch.path().join("__diff__");

    // Base corpus: a stable image, a changing image, one to be removed.
    let base_archive = tgz(&[
        ("ui/stable.png", png(20, 20, |_, _| BLACK).as_slice()),
        ("ui/button.png", png(30, 30, |_, _| BLACK).as_slice()),
        ("ui/removed.png", png(8, 8, |_, _| BLACK).as_slice()),
    ]);
    // Current corpus: the changing image flips every pixel, one image added.
    let current_archive = tgz(&[
        ("ui/stable.png", png(20, 20, |_, _| BLACK).as_slice()),
        ("ui/button.png", png(30, 30, |_, _| RED).as_slice()),
        ("ui/added.png", png(8, 8, |_, _| BLACK).as_slice()),
    ]);

    unpack_tgz(&base_archive, &base_dir).unwrap();
    unpack_tgz(&current_archive, &current_dir).unwrap();

    let base = SnapshotTree::new(&base_dir);
    let current = SnapshotTree::new(&current_dir);

    // Relative paths survive archive round-trips with their nesting intact.
    let paths: Vec<String> = base.relative_paths().unwrap().into_iter().collect();
    assert_eq!(
        paths,
        vec!["/ui/button.png", "/ui/removed.png", "/ui/stable.png"]
    );

    let report = diff_trees(&base, &current, &output_dir).await.unwrap();

    assert_eq!(report.total, 3);
    assert_eq!(
        report.total,
        report.different.len() + report.not_in_base.len() + report.not_in_current.len()
    );

    let order: Vec<&str> = report.all.iter().map(|r| r.display_path.as_str()).collect();
    assert_eq!(
        order,
        vec!["/ui/button.png", "/ui/added.png", "/ui/removed.png"]
    );

    // The pixel-different record points at a freshly composed artifact.
    assert!(report.different[0].file_path.starts_with(&output_dir));
    let artifact = image::open(&report.different[0].file_path).unwrap().to_rgba8();
    assert_eq!(artifact.dimensions(), (90, 30));

    // Presence records point at the snapshots themselves.
    assert_eq!(
        report.not_in_current[0].file_path,
        current_dir.join("ui/added.png")
    );
    assert_eq!(
        report.not_in_base[0].file_path,
        base_dir.join("ui/removed.png")
    );
}

#[tokio::test]
async fn identical_corpora_yield_an_empty_report() {
    let scratch = tempfile::tempdir().unwrap();
    let archive = tgz(&[("a.png", png(16, 16, |x, y| {
        if (x + y) % 2 == 0 { BLACK } else { RED }
    })
    .as_slice())]);

    let base_dir = scratch.path().join("base");
    let current_dir = scratch.path().join("current");
    unpack_tgz(&archive, &base_dir).unwrap();
    unpack_tgz(&archive, &current_dir).unwrap();

    let report = diff_trees(
        &SnapshotTree::new(&base_dir),
        &SnapshotTree::new(&current_dir),
        &scratch.path().join("__diff__"),
    )
    .await
    .unwrap();

    assert_eq!(report.total, 0);
    assert!(report.all.is_empty());
}

#[test]
fn lock_resolution_gates_the_whole_run() {
    // Identical texts resolve without parsing, malformed or not.
    assert_eq!(
        resolve_update_commits("???", "???").unwrap(),
        Resolution::Unchanged
    );

    let base = "last_update_commit: aaa\n";
    let current = "last_update_commit: bbb\n";
    let Resolution::Changed {
        base_update,
        current_update,
    } = resolve_update_commits(base, current).unwrap()
    else {
        panic!("expected Changed");
    };
    assert_eq!(base_update, "aaa");
    assert_eq!(current_update, "bbb");
}
