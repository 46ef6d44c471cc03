pub const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS images (
        id INTEGER PRIMARY KEY,
        external_id TEXT UNIQUE NOT NULL,
        width INTEGER NOT NULL,
        height INTEGER NOT NULL,
        url TEXT NOT NULL,
        content BLOB,
        filename TEXT
    );

    CREATE TABLE IF NOT EXISTS breeds (
        id INTEGER PRIMARY KEY,
        external_id TEXT UNIQUE NOT NULL,
        name TEXT NOT NULL,
        description TEXT NOT NULL,
        alt_names TEXT NOT NULL DEFAULT '',
        origin TEXT NOT NULL DEFAULT '',
        country_code TEXT NOT NULL DEFAULT '',
        vetstreet_url TEXT NOT NULL DEFAULT '',
        wikipedia_url TEXT NOT NULL DEFAULT '',

        weight_imperial_min INTEGER,
        weight_imperial_max INTEGER,
        weight_metric_min INTEGER,
        weight_metric_max INTEGER,

        life_span_min INTEGER,
        life_span_max INTEGER,

        temperament TEXT NOT NULL DEFAULT '',
        adaptability INTEGER,
        affection_level INTEGER,
        child_friendly INTEGER,
        dog_friendly INTEGER,
        energy_level INTEGER,
        grooming INTEGER,
        health_issues INTEGER,
        intelligence INTEGER,
        shedding_level INTEGER,
        social_needs INTEGER,
        stranger_friendly INTEGER,
        vocalisation INTEGER,

        indoor INTEGER,
        experimental INTEGER,
        hairless INTEGER,
        \"natural\" INTEGER,
        rare INTEGER,
        rex INTEGER,
        suppressed_tail INTEGER,
        short_legs INTEGER,
        hypoallergenic INTEGER,

        reference_image_id TEXT NOT NULL DEFAULT '',
        image_id INTEGER REFERENCES images(id)
    );
";
