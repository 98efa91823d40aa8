//! Catalog CLI: manage videos, categories and genders from the shell.
//!
//! Reads DATABASE_URL and the storage settings from the environment (or a
//! `.env` file).

use anyhow::Context;
use catalog_cli::{content_type_for, init_tracing, parse_file_arg, parse_slot, print_json};
use catalog_core::models::{fields, AttributeValue, Attributes, FileSlot, RelationKind, UploadedFile};
use catalog_core::Config;
use catalog_db::{connect, setup_database};
use catalog_services::{create_storage, FileLifecycle, PgCatalogStore, VideoWriter};
use clap::{Args, Parser, Subcommand};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "catalog", about = "Video catalog administration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Category operations
    Category {
        #[command(subcommand)]
        sub: CategoryCommands,
    },
    /// Gender operations
    Gender {
        #[command(subcommand)]
        sub: GenderCommands,
    },
    /// Video operations
    Video {
        #[command(subcommand)]
        sub: VideoCommands,
    },
    /// Check that the genders cover every category
    Coverage {
        /// Category UUIDs
        #[arg(long = "category", value_name = "UUID")]
        categories: Vec<Uuid>,
        /// Gender UUIDs
        #[arg(long = "gender", value_name = "UUID")]
        genders: Vec<Uuid>,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Create a category
    Add { name: String },
    /// Trash a category
    Trash { id: Uuid },
}

#[derive(Subcommand)]
enum GenderCommands {
    /// Create a gender grouping the given categories
    Add {
        name: String,
        #[arg(long = "category", value_name = "UUID")]
        categories: Vec<Uuid>,
    },
    /// Replace the categories a gender groups
    SetCategories {
        id: Uuid,
        #[arg(long = "category", value_name = "UUID")]
        categories: Vec<Uuid>,
    },
    /// Trash a gender
    Trash { id: Uuid },
}

#[derive(Subcommand)]
enum VideoCommands {
    /// Create a video
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        rating: String,
        /// Duration in minutes
        #[arg(long)]
        duration: i32,
        #[arg(long)]
        opened: bool,
        #[command(flatten)]
        relations: RelationArgs,
        #[command(flatten)]
        files: FileArgs,
    },
    /// Update the fields given on the command line
    Update {
        id: Uuid,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        rating: Option<String>,
        #[arg(long)]
        duration: Option<i32>,
        #[arg(long)]
        opened: Option<bool>,
        #[command(flatten)]
        relations: RelationArgs,
        #[command(flatten)]
        files: FileArgs,
        /// Empty a file slot, deleting its file
        #[arg(long = "clear", value_name = "SLOT")]
        clear: Vec<String>,
    },
    /// Trash a video
    Trash { id: Uuid },
    /// Show a video with its relations and file URLs
    Show {
        id: Uuid,
        #[arg(long)]
        include_deleted: bool,
    },
}

#[derive(Args)]
struct RelationArgs {
    /// Category UUIDs; replaces the current set
    #[arg(long = "category", value_name = "UUID")]
    categories: Vec<Uuid>,
    /// Gender UUIDs; replaces the current set
    #[arg(long = "gender", value_name = "UUID")]
    genders: Vec<Uuid>,
    /// Remove every category
    #[arg(long)]
    clear_categories: bool,
    /// Remove every gender
    #[arg(long)]
    clear_genders: bool,
}

impl RelationArgs {
    fn apply(self, mut attrs: Attributes) -> Attributes {
        if self.clear_categories || !self.categories.is_empty() {
            attrs.insert(fields::CATEGORIES_ID, self.categories);
        }
        if self.clear_genders || !self.genders.is_empty() {
            attrs.insert(fields::GENDERS_ID, self.genders);
        }
        attrs
    }
}

#[derive(Args)]
struct FileArgs {
    /// File to store, as slot=path (slots: video, thumb, banner, trailer)
    #[arg(long = "file", value_name = "SLOT=PATH")]
    files: Vec<String>,
}

impl FileArgs {
    async fn apply(self, mut attrs: Attributes) -> anyhow::Result<Attributes> {
        for arg in self.files {
            let (slot, path) = parse_file_arg(&arg)?;
            let data = tokio::fs::read(&path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let file = UploadedFile::new(name, content_type_for(&path), data);
            attrs.insert(slot.attribute_key(), file);
        }
        Ok(attrs)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    if let Commands::Migrate = cli.command {
        setup_database(&config)
            .await
            .context("Failed to migrate the database")?;
        println!("Migrations up to date");
        return Ok(());
    }

    let pool = connect(&config)
        .await
        .context("Failed to connect to the database")?;
    let store = Arc::new(PgCatalogStore::new(pool));
    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage")?;
    let writer = VideoWriter::new(store.clone(), store.clone(), FileLifecycle::new(storage));

    match cli.command {
        Commands::Migrate => {}
        Commands::Category { sub } => match sub {
            CategoryCommands::Add { name } => {
                print_json(&store.create_category(&name).await?)?;
            }
            CategoryCommands::Trash { id } => {
                let trashed = store.soft_delete_tag(RelationKind::Categories, id).await?;
                print_json(&serde_json::json!({ "id": id, "trashed": trashed }))?;
            }
        },
        Commands::Gender { sub } => match sub {
            GenderCommands::Add { name, categories } => {
                print_json(&store.create_gender(&name, &categories).await?)?;
            }
            GenderCommands::SetCategories { id, categories } => {
                store.sync_gender_categories(id, &categories).await?;
                print_json(&serde_json::json!({ "id": id, "categories_id": categories }))?;
            }
            GenderCommands::Trash { id } => {
                let trashed = store.soft_delete_tag(RelationKind::Genders, id).await?;
                print_json(&serde_json::json!({ "id": id, "trashed": trashed }))?;
            }
        },
        Commands::Video { sub } => match sub {
            VideoCommands::Create {
                title,
                description,
                year,
                rating,
                duration,
                opened,
                relations,
                files,
            } => {
                let attrs = Attributes::new()
                    .with(fields::TITLE, title)
                    .with(fields::DESCRIPTION, description)
                    .with(fields::YEAR_LAUNCHED, year)
                    .with(fields::RATING, rating)
                    .with(fields::DURATION, duration)
                    .with(fields::OPENED, opened);
                let attrs = files.apply(relations.apply(attrs)).await?;
                let video = writer.create(attrs).await?;
                show(&writer, video.id, false).await?;
            }
            VideoCommands::Update {
                id,
                title,
                description,
                year,
                rating,
                duration,
                opened,
                relations,
                files,
                clear,
            } => {
                let mut attrs = Attributes::new();
                if let Some(title) = title {
                    attrs.insert(fields::TITLE, title);
                }
                if let Some(description) = description {
                    attrs.insert(fields::DESCRIPTION, description);
                }
                if let Some(year) = year {
                    attrs.insert(fields::YEAR_LAUNCHED, year);
                }
                if let Some(rating) = rating {
                    attrs.insert(fields::RATING, rating);
                }
                if let Some(duration) = duration {
                    attrs.insert(fields::DURATION, duration);
                }
                if let Some(opened) = opened {
                    attrs.insert(fields::OPENED, opened);
                }
                for slot in clear {
                    attrs.insert(parse_slot(&slot)?.attribute_key(), AttributeValue::Null);
                }
                let attrs = files.apply(relations.apply(attrs)).await?;
                writer.update(id, attrs).await?;
                show(&writer, id, false).await?;
            }
            VideoCommands::Trash { id } => {
                writer.trash(id).await?;
                print_json(&serde_json::json!({ "id": id, "trashed": true }))?;
            }
            VideoCommands::Show {
                id,
                include_deleted,
            } => show(&writer, id, include_deleted).await?,
        },
        Commands::Coverage { categories, genders } => {
            let covered = writer.validate_coverage(&categories, &genders).await?;
            print_json(&serde_json::json!({ "covered": covered }))?;
        }
    }

    Ok(())
}

async fn show(writer: &VideoWriter, id: Uuid, include_deleted: bool) -> anyhow::Result<()> {
    let video = writer.find(id, include_deleted).await?;
    let categories = writer.related_ids(id, RelationKind::Categories).await?;
    let genders = writer.related_ids(id, RelationKind::Genders).await?;

    let mut urls = serde_json::Map::new();
    for slot in FileSlot::ALL {
        if let Some(url) = writer.file_url(&video, slot)? {
            urls.insert(slot.attribute_key().to_string(), url.into());
        }
    }

    print_json(&serde_json::json!({
        "video": video,
        "categories_id": categories,
        "genders_id": genders,
        "file_urls": urls,
    }))
}
