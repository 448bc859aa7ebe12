//! End-to-end pipeline tests: build a package, then check the published
//! artifact's container structure, digest chain, and signature from the
//! bytes on disk.

use sha2::Digest;
use std::io::{Cursor, Read};
use std::sync::Arc;
use storeforge_bundler::bundler::{
    archive::{self, ArchiveBuilder, CompressionMode},
    resources::{BinaryManifest, LayoutResource, ResourceTable},
    signing, stub, BuildRequest, BuildStage, Error, InMemoryHistory, PackageBuilder,
    SigningError, SigningIdentity, ValidationError,
};

fn request() -> BuildRequest {
    BuildRequest {
        app_name: "Acme Shop".to_string(),
        package_id: "com.acme.shop".to_string(),
        version_name: "1.0.0".to_string(),
        version_code: 1,
        primary_color: "#3366FF".to_string(),
        secondary_color: "#FF9900".to_string(),
        api_base_url: "https://shop.acme.example/app".to_string(),
        store_id: "store-42".to_string(),
        store_name: "Acme".to_string(),
    }
}

fn identity() -> SigningIdentity {
    SigningIdentity::from_seed([7u8; 32], "CN=Acme Storefront")
}

fn signed_builder(out_dir: &std::path::Path) -> PackageBuilder {
    PackageBuilder::new(out_dir, Arc::new(InMemoryHistory::new())).with_identity(identity())
}

fn read_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("open archive");
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).expect("entry");
        let mut content = Vec::new();
        file.read_to_end(&mut content).expect("read entry");
        entries.push((file.name().to_string(), content));
    }
    entries
}

fn entry<'a>(entries: &'a [(String, Vec<u8>)], name: &str) -> &'a [u8] {
    entries
        .iter()
        .find(|(n, _)| n == name)
        .map(|(_, b)| b.as_slice())
        .unwrap_or_else(|| panic!("entry {name} missing"))
}

#[tokio::test]
async fn build_publishes_a_valid_signed_archive() {
    let dir = tempfile::tempdir().expect("tempdir");
    let metadata = signed_builder(dir.path())
        .build(&request())
        .await
        .expect("build");

    assert!(metadata.artifact_path.exists());
    assert_eq!(metadata.package_id, "com.acme.shop");
    assert_eq!(metadata.version_code, 1);

    let bytes = std::fs::read(&metadata.artifact_path).expect("read artifact");
    assert_eq!(bytes.len() as u64, metadata.size_bytes);

    // Central-directory record count equals local-header count.
    let counts = archive::entry_counts(&bytes).expect("counts");
    assert_eq!(counts.local_headers, counts.central_records);
    assert_eq!(counts.central_records, 8);

    let entries = read_entries(&bytes);
    for name in [
        "manifest.bin",
        "resources.bin",
        "res/layout/storefront.bin",
        "res/icon/launcher.png",
        "classes.bin",
        "META-INF/MANIFEST.MF",
        "META-INF/CERT.SF",
        "META-INF/CERT.SIG",
    ] {
        assert!(entries.iter().any(|(n, _)| n == name), "{name}");
    }

    // Signature entries come after every content entry.
    let first_meta = entries
        .iter()
        .position(|(n, _)| n.starts_with("META-INF/"))
        .expect("meta entries");
    assert!(entries[first_meta..]
        .iter()
        .all(|(n, _)| n.starts_with("META-INF/")));
}

#[tokio::test]
async fn digest_and_signature_chain_verifies_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let metadata = signed_builder(dir.path())
        .build(&request())
        .await
        .expect("build");

    let bytes = std::fs::read(&metadata.artifact_path).expect("read artifact");
    let certificate = signing::verify_archive(&bytes).expect("chain verifies");
    assert_eq!(certificate.subject, "CN=Acme Storefront");

    // Digest round-trip: recompute each content digest from the archive
    // bytes and compare against the recorded manifest.
    let entries = read_entries(&bytes);
    let manifest = signing::DigestManifest::parse(entry(&entries, "META-INF/MANIFEST.MF"))
        .expect("parse manifest");
    assert_eq!(manifest.len(), 5);
    for (name, content) in entries.iter().filter(|(n, _)| !n.starts_with("META-INF/")) {
        let recomputed: [u8; 32] = sha2::Sha256::digest(content).into();
        assert_eq!(manifest.entry_digest(name), Some(&recomputed), "{name}");
    }
}

#[tokio::test]
async fn published_chunks_round_trip_through_their_decoders() {
    let dir = tempfile::tempdir().expect("tempdir");
    let metadata = signed_builder(dir.path())
        .build(&request())
        .await
        .expect("build");

    let bytes = std::fs::read(&metadata.artifact_path).expect("read artifact");
    let entries = read_entries(&bytes);

    let manifest_bytes = entry(&entries, "manifest.bin");
    let manifest = BinaryManifest::decode(manifest_bytes).expect("decode manifest");
    assert_eq!(manifest.package_id, "com.acme.shop");
    assert_eq!(manifest.version_code, 1);
    assert_eq!(manifest.encode().expect("re-encode"), manifest_bytes);

    let table_bytes = entry(&entries, "resources.bin");
    let table = ResourceTable::decode(table_bytes).expect("decode table");
    assert!(table.colors.iter().any(|(n, _)| n == "brand_primary"));
    assert_eq!(table.encode().expect("re-encode"), table_bytes);

    let layout_bytes = entry(&entries, "res/layout/storefront.bin");
    let layout = LayoutResource::decode(layout_bytes).expect("decode layout");
    assert_eq!(layout.encode().expect("re-encode"), layout_bytes);

    let summary = stub::verify(entry(&entries, "classes.bin")).expect("verify stub");
    assert_eq!(summary.activity_class, "com.acme.shop.StoreActivity");
    assert_eq!(summary.content_url, "https://shop.acme.example/app");
}

#[tokio::test]
async fn bad_package_id_is_rejected_before_anything_is_written() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out_dir = dir.path().join("dist");
    let mut bad = request();
    bad.package_id = "My Store App".to_string();

    let err = signed_builder(&out_dir).build(&bad).await.expect_err("invalid id");
    match err {
        Error::Stage { stage, source } => {
            assert_eq!(stage, BuildStage::Validating);
            match *source {
                Error::Validation(ValidationError { field, .. }) => {
                    assert_eq!(field, "package_id")
                }
                other => panic!("unexpected error: {other}"),
            }
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!out_dir.exists());
}

#[tokio::test]
async fn version_code_must_increase_across_builds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let history = Arc::new(InMemoryHistory::new());
    let builder = PackageBuilder::new(dir.path(), history.clone()).with_identity(identity());

    let metadata = builder.build(&request()).await.expect("first build");
    history.record(&metadata.package_id, metadata.version_code);

    let err = builder.build(&request()).await.expect_err("stale code");
    assert!(err.to_string().contains("must increase"));

    let mut next = request();
    next.version_code = 2;
    let metadata = builder.build(&next).await.expect("second build");
    assert!(metadata
        .artifact_path
        .to_string_lossy()
        .ends_with("com.acme.shop-2.apk"));
}

#[tokio::test]
async fn bumping_version_code_changes_only_manifest_derived_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let a = signed_builder(dir.path()).build(&request()).await.expect("build a");
    let mut bumped = request();
    bumped.version_code = 2;
    let b = signed_builder(dir.path()).build(&bumped).await.expect("build b");

    let entries_a = read_entries(&std::fs::read(&a.artifact_path).expect("read a"));
    let entries_b = read_entries(&std::fs::read(&b.artifact_path).expect("read b"));
    assert_eq!(entries_a.len(), entries_b.len());

    for ((name_a, bytes_a), (name_b, bytes_b)) in entries_a.iter().zip(entries_b.iter()) {
        assert_eq!(name_a, name_b);
        let derived_from_manifest = name_a == "manifest.bin" || name_a.starts_with("META-INF/");
        if derived_from_manifest {
            assert_ne!(bytes_a, bytes_b, "{name_a} should change");
        } else {
            assert_eq!(bytes_a, bytes_b, "{name_a} should not change");
        }
    }
}

#[tokio::test]
async fn missing_identity_fails_at_signing_with_nothing_published() {
    let dir = tempfile::tempdir().expect("tempdir");
    let out_dir = dir.path().join("dist");
    let builder = PackageBuilder::new(&out_dir, Arc::new(InMemoryHistory::new()));

    let err = builder.build(&request()).await.expect_err("unsigned");
    match err {
        Error::Stage { stage, source } => {
            assert_eq!(stage, BuildStage::Signing);
            assert!(matches!(*source, Error::Signing(SigningError::MissingIdentity)));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!out_dir.exists());
}

#[tokio::test]
async fn tampered_content_entry_fails_the_digest_check() {
    let dir = tempfile::tempdir().expect("tempdir");
    let metadata = signed_builder(dir.path())
        .build(&request())
        .await
        .expect("build");
    let bytes = std::fs::read(&metadata.artifact_path).expect("read artifact");

    // Repack with one content byte flipped, signature entries untouched.
    let entries = read_entries(&bytes);
    let mut repack = ArchiveBuilder::new();
    for (name, content) in &entries {
        let mut content = content.clone();
        if name == "manifest.bin" {
            content[0] ^= 0x01;
        }
        let mode = if name.starts_with("META-INF/") {
            CompressionMode::Deflated
        } else {
            CompressionMode::Stored
        };
        repack.append(name, content, mode).expect("append");
    }

    let err = signing::verify_archive(&repack.write().expect("write")).expect_err("tampered");
    match err {
        Error::Signing(SigningError::DigestMismatch { name }) => {
            assert_eq!(name, "manifest.bin")
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn independent_packages_build_concurrently() {
    let dir = tempfile::tempdir().expect("tempdir");
    let builder = signed_builder(dir.path());

    let mut other = request();
    other.package_id = "org.birch.books".to_string();
    other.app_name = "Birch Books".to_string();

    let one = request();
    let (a, b) = tokio::join!(builder.build(&one), builder.build(&other));
    let a = a.expect("build a");
    let b = b.expect("build b");
    assert_ne!(a.artifact_path, b.artifact_path);
    assert!(a.artifact_path.exists());
    assert!(b.artifact_path.exists());
}
