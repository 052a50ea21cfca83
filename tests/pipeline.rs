use std::path::PathBuf;

use anyhow::{Result, bail};
use assert_fs::TempDir;
use assert_fs::prelude::*;
use rstest::*;

use imcatalog::CatalogError;
use imcatalog::builder::RecordBuilder;
use imcatalog::collab::{DescribeRequest, Describer, Description, Embedder, SearchQuery, Searcher};
use imcatalog::discover::FileRange;
use imcatalog::error::Stage;
use imcatalog::pipeline::{self, FailurePolicy, RunOptions, RunSummary};
use imcatalog::store::{Identity, MetadataStore};

struct ByteEmbedder;

impl Embedder for ByteEmbedder {
    async fn embed_bytes(&self, data: Vec<u8>) -> Result<Vec<f32>> {
        if data == b"bad" {
            bail!("cannot decode image");
        }
        Ok(vec![data.len() as f32, 1.0])
    }
}

struct EchoDescriber;

impl Describer for EchoDescriber {
    async fn describe(&self, request: &DescribeRequest<'_>) -> Result<Description> {
        Ok(Description {
            short: format!("cake {}", request.embedding[0]),
            long: format!("a cake of size {}", request.embedding[0]),
        })
    }
}

struct FixedSearcher;

impl Searcher for FixedSearcher {
    async fn find_links(&self, query: &SearchQuery<'_>) -> Result<Vec<String>> {
        Ok((0..query.count).map(|i| format!("http://img/{}/{}", query.text.replace(' ', "_"), i)).collect())
    }
}

struct Workspace {
    dir: TempDir,
    store: PathBuf,
}

impl Workspace {
    fn source(&self) -> PathBuf {
        self.dir.path().join("src")
    }

    fn options(&self) -> RunOptions {
        RunOptions::new(self.source(), &self.store)
    }

    fn builder(&self) -> RecordBuilder {
        RecordBuilder::new(self.dir.path().join("out"))
    }

    async fn run(&self, opts: &RunOptions) -> imcatalog::Result<RunSummary> {
        pipeline::run(opts, &self.builder(), &ByteEmbedder, &EchoDescriber, &FixedSearcher).await
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().unwrap();
    dir.child("src/a.png").write_binary(b"aa").unwrap();
    dir.child("src/b.png").write_binary(b"bbb").unwrap();
    dir.child("src/nested/c.JPG").write_binary(b"cccc").unwrap();
    dir.child("src/notes.txt").write_str("not an image").unwrap();
    let store = dir.path().join("_img_metadata.csv");
    Workspace { dir, store }
}

#[rstest]
#[tokio::test]
async fn builds_a_record_per_image(workspace: Workspace) -> Result<()> {
    let summary = workspace.run(&workspace.options()).await?;
    assert_eq!(summary, RunSummary { discovered: 3, processed: 3, inserted: 3, ..Default::default() });

    let store = MetadataStore::open(&workspace.store)?;
    let record = store.get(&Identity::from_path(workspace.source().join("a.png"))).unwrap();
    assert_eq!(record.short_description, "cake 2");
    assert_eq!(record.search_links.len(), 5);
    assert_eq!(record.img_counts, 5);
    assert_eq!(record.output_file_directory, workspace.dir.path().join("out/a").to_string_lossy());
    assert!(!record.embedding.is_empty());
    Ok(())
}

#[rstest]
#[tokio::test]
async fn rerun_accumulates_counts_only(workspace: Workspace) -> Result<()> {
    workspace.run(&workspace.options()).await?;
    let summary = workspace.run(&workspace.options()).await?;
    assert_eq!(summary.updated, 3);
    assert_eq!(summary.inserted, 0);

    let store = MetadataStore::open(&workspace.store)?;
    assert_eq!(store.len(), 3);
    for record in store.records() {
        assert_eq!(record.search_links.len(), 5);
        assert_eq!(record.img_counts, 10);
    }
    Ok(())
}

#[rstest]
#[tokio::test]
async fn range_selects_sorted_slice(workspace: Workspace) -> Result<()> {
    let mut opts = workspace.options();
    opts.range = Some(FileRange::new(1, 2));
    let summary = workspace.run(&opts).await?;
    assert_eq!(summary.processed, 1);

    let store = MetadataStore::open(&workspace.store)?;
    assert_eq!(store.records()[0].file_name, "b.png");
    Ok(())
}

#[rstest]
#[case(1)]
#[case(4)]
#[tokio::test]
async fn merge_order_follows_discovery(workspace: Workspace, #[case] jobs: usize) -> Result<()> {
    let mut opts = workspace.options();
    opts.jobs = jobs;
    workspace.run(&opts).await?;

    let store = MetadataStore::open(&workspace.store)?;
    let names = store.records().iter().map(|r| r.file_name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["a.png", "b.png", "c.JPG"]);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn abort_leaves_store_untouched(workspace: Workspace) -> Result<()> {
    workspace.dir.child("src/b.png").write_binary(b"bad")?;

    let err = workspace.run(&workspace.options()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Collaborator { stage: Stage::Embed, .. }));
    assert!(!workspace.store.exists());
    Ok(())
}

#[rstest]
#[tokio::test]
async fn skip_saves_the_rest(workspace: Workspace) -> Result<()> {
    workspace.dir.child("src/b.png").write_binary(b"bad")?;
    let mut opts = workspace.options();
    opts.policy = FailurePolicy::Skip;

    let summary = workspace.run(&opts).await?;
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 2);

    let store = MetadataStore::open(&workspace.store)?;
    assert_eq!(store.len(), 2);
    assert!(store.find_by_file_name("b.png").is_none());
    Ok(())
}

#[rstest]
#[tokio::test]
async fn missing_source_is_not_found(workspace: Workspace) {
    let opts = RunOptions::new(workspace.dir.path().join("missing"), &workspace.store);
    let err = workspace.run(&opts).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[rstest]
#[case("src/.")]
#[case("src//")]
#[tokio::test]
async fn unnormalized_source_keeps_one_row(workspace: Workspace, #[case] source: &str) -> Result<()> {
    workspace.run(&workspace.options()).await?;

    let opts = RunOptions::new(format!("{}/{}", workspace.dir.path().display(), source), &workspace.store);
    let summary = workspace.run(&opts).await?;
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.updated, 3);

    let store = MetadataStore::open(&workspace.store)?;
    assert_eq!(store.len(), 3);
    assert_eq!(std::fs::read_to_string(&workspace.store)?.lines().count(), 4);
    Ok(())
}

#[rstest]
#[tokio::test]
async fn unwritable_store_fails_the_run(workspace: Workspace) -> Result<()> {
    let mut tmp = workspace.store.clone().into_os_string();
    tmp.push(".tmp");
    std::fs::create_dir(&tmp)?;

    let err = workspace.run(&workspace.options()).await.unwrap_err();
    assert!(matches!(err, CatalogError::Io(_)));
    assert!(!workspace.store.exists());
    Ok(())
}
