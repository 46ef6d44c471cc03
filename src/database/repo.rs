use std::collections::HashSet;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::database::schema::SCHEMA;

/// One breed row, keyed by the upstream external id. Produced by the mapper,
/// written back with a full-field upsert (the `image_id` link column is
/// managed separately by the sync job).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreedRecord {
    pub external_id: String,
    pub name: String,
    pub description: String,
    pub alt_names: String,
    pub origin: String,
    pub country_code: String,
    pub vetstreet_url: String,
    pub wikipedia_url: String,

    pub weight_imperial_min: i64,
    pub weight_imperial_max: i64,
    pub weight_metric_min: i64,
    pub weight_metric_max: i64,

    pub life_span_min: i64,
    pub life_span_max: i64,

    pub temperament: String,
    pub adaptability: i64,
    pub affection_level: i64,
    pub child_friendly: i64,
    pub dog_friendly: i64,
    pub energy_level: i64,
    pub grooming: i64,
    pub health_issues: i64,
    pub intelligence: i64,
    pub shedding_level: i64,
    pub social_needs: i64,
    pub stranger_friendly: i64,
    pub vocalisation: i64,

    pub indoor: bool,
    pub experimental: bool,
    pub hairless: bool,
    pub natural: bool,
    pub rare: bool,
    pub rex: bool,
    pub suppressed_tail: bool,
    pub short_legs: bool,
    pub hypoallergenic: bool,

    pub reference_image_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    pub external_id: String,
    pub url: String,
    pub width: i64,
    pub height: i64,
}

/// Keyed upsert store over a single SQLite connection. Every operation is a
/// single statement, so rows are atomic individually; the sync job never
/// needs a transaction spanning both tables.
pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path).context("Failed to open database")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize schema")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize schema")?;
        Ok(Self { conn })
    }

    /// All image external ids currently present. The sync job diffs the
    /// required set against this to avoid re-fetching known images.
    pub fn image_external_ids(&self) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT external_id FROM images")
            .context("Failed to prepare image id query")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()
            .context("Failed to read image ids")?;
        Ok(ids)
    }

    pub fn find_image(&self, external_id: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                "SELECT id FROM images WHERE external_id = ?1",
                params![external_id],
                |row| row.get(0),
            )
            .optional()
            .context("Failed to look up image")
    }

    /// Insert an image row, or refresh its metadata if the external id is
    /// already present. Cached content is never overwritten here.
    pub fn insert_image(&self, record: &ImageRecord) -> Result<i64> {
        self.conn
            .query_row(
                "INSERT INTO images (external_id, width, height, url)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(external_id) DO UPDATE SET
                    width = excluded.width,
                    height = excluded.height,
                    url = excluded.url
                 RETURNING id",
                params![record.external_id, record.width, record.height, record.url],
                |row| row.get(0),
            )
            .context("Failed to insert image")
    }

    pub fn attach_image_content(
        &self,
        external_id: &str,
        filename: &str,
        content: &[u8],
    ) -> Result<()> {
        self.conn
            .execute(
                "UPDATE images SET content = ?1, filename = ?2 WHERE external_id = ?3",
                params![content, filename, external_id],
            )
            .context("Failed to store image content")?;
        Ok(())
    }

    /// Create-or-update a breed by external id, replacing every mapped field
    /// with the current upstream truth. The `image_id` link is left alone;
    /// `set_breed_image` owns that column.
    pub fn upsert_breed(&self, record: &BreedRecord) -> Result<i64> {
        self.conn
            .query_row(
                "INSERT INTO breeds (
                    external_id, name, description, alt_names, origin,
                    country_code, vetstreet_url, wikipedia_url,
                    weight_imperial_min, weight_imperial_max,
                    weight_metric_min, weight_metric_max,
                    life_span_min, life_span_max,
                    temperament, adaptability, affection_level, child_friendly,
                    dog_friendly, energy_level, grooming, health_issues,
                    intelligence, shedding_level, social_needs,
                    stranger_friendly, vocalisation,
                    indoor, experimental, hairless, \"natural\", rare, rex,
                    suppressed_tail, short_legs, hypoallergenic,
                    reference_image_id
                 ) VALUES (
                    ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13,
                    ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24,
                    ?25, ?26, ?27, ?28, ?29, ?30, ?31, ?32, ?33, ?34, ?35,
                    ?36, ?37
                 )
                 ON CONFLICT(external_id) DO UPDATE SET
                    name = excluded.name,
                    description = excluded.description,
                    alt_names = excluded.alt_names,
                    origin = excluded.origin,
                    country_code = excluded.country_code,
                    vetstreet_url = excluded.vetstreet_url,
                    wikipedia_url = excluded.wikipedia_url,
                    weight_imperial_min = excluded.weight_imperial_min,
                    weight_imperial_max = excluded.weight_imperial_max,
                    weight_metric_min = excluded.weight_metric_min,
                    weight_metric_max = excluded.weight_metric_max,
                    life_span_min = excluded.life_span_min,
                    life_span_max = excluded.life_span_max,
                    temperament = excluded.temperament,
                    adaptability = excluded.adaptability,
                    affection_level = excluded.affection_level,
                    child_friendly = excluded.child_friendly,
                    dog_friendly = excluded.dog_friendly,
                    energy_level = excluded.energy_level,
                    grooming = excluded.grooming,
                    health_issues = excluded.health_issues,
                    intelligence = excluded.intelligence,
                    shedding_level = excluded.shedding_level,
                    social_needs = excluded.social_needs,
                    stranger_friendly = excluded.stranger_friendly,
                    vocalisation = excluded.vocalisation,
                    indoor = excluded.indoor,
                    experimental = excluded.experimental,
                    hairless = excluded.hairless,
                    \"natural\" = excluded.\"natural\",
                    rare = excluded.rare,
                    rex = excluded.rex,
                    suppressed_tail = excluded.suppressed_tail,
                    short_legs = excluded.short_legs,
                    hypoallergenic = excluded.hypoallergenic,
                    reference_image_id = excluded.reference_image_id
                 RETURNING id",
                params![
                    record.external_id,
                    record.name,
                    record.description,
                    record.alt_names,
                    record.origin,
                    record.country_code,
                    record.vetstreet_url,
                    record.wikipedia_url,
                    record.weight_imperial_min,
                    record.weight_imperial_max,
                    record.weight_metric_min,
                    record.weight_metric_max,
                    record.life_span_min,
                    record.life_span_max,
                    record.temperament,
                    record.adaptability,
                    record.affection_level,
                    record.child_friendly,
                    record.dog_friendly,
                    record.energy_level,
                    record.grooming,
                    record.health_issues,
                    record.intelligence,
                    record.shedding_level,
                    record.social_needs,
                    record.stranger_friendly,
                    record.vocalisation,
                    record.indoor,
                    record.experimental,
                    record.hairless,
                    record.natural,
                    record.rare,
                    record.rex,
                    record.suppressed_tail,
                    record.short_legs,
                    record.hypoallergenic,
                    record.reference_image_id,
                ],
                |row| row.get(0),
            )
            .context("Failed to upsert breed")
    }

    /// Reference snapshot for a breed: its stored `reference_image_id` and
    /// the current link value. `None` when the breed has never been seen.
    pub fn breed_reference(&self, external_id: &str) -> Result<Option<(String, Option<i64>)>> {
        self.conn
            .query_row(
                "SELECT reference_image_id, image_id FROM breeds WHERE external_id = ?1",
                params![external_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
            .context("Failed to read breed reference")
    }

    pub fn set_breed_image(&self, external_id: &str, image_id: Option<i64>) -> Result<()> {
        self.conn
            .execute(
                "UPDATE breeds SET image_id = ?1 WHERE external_id = ?2",
                params![image_id, external_id],
            )
            .context("Failed to update breed image link")?;
        Ok(())
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
pub fn sample_breed(external_id: &str) -> BreedRecord {
    BreedRecord {
        external_id: external_id.to_string(),
        name: "Aegean".to_string(),
        description: "Natural island cat.".to_string(),
        alt_names: String::new(),
        origin: "Greece".to_string(),
        country_code: "GR".to_string(),
        vetstreet_url: "http://www.vetstreet.com/cats/aegean-cat".to_string(),
        wikipedia_url: "https://en.wikipedia.org/wiki/Aegean_cat".to_string(),
        weight_imperial_min: 7,
        weight_imperial_max: 10,
        weight_metric_min: 3,
        weight_metric_max: 5,
        life_span_min: 9,
        life_span_max: 12,
        temperament: "Affectionate, Social".to_string(),
        adaptability: 5,
        affection_level: 4,
        child_friendly: 4,
        dog_friendly: 4,
        energy_level: 3,
        grooming: 3,
        health_issues: 1,
        intelligence: 3,
        shedding_level: 3,
        social_needs: 4,
        stranger_friendly: 4,
        vocalisation: 3,
        indoor: false,
        experimental: false,
        hairless: false,
        natural: true,
        rare: false,
        rex: false,
        suppressed_tail: false,
        short_legs: false,
        hypoallergenic: false,
        reference_image_id: String::new(),
    }
}
