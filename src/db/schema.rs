pub const SCHEMA: &str = r#"
-- Albums: user-defined named groupings, managed outside the indexer
CREATE TABLE IF NOT EXISTS albums (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    description TEXT,
    creation_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);

-- GPS clusters: rounded coordinate cells, rebuilt after every scan
CREATE TABLE IF NOT EXISTS gps_clusters (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    cluster_latitude REAL NOT NULL,
    cluster_longitude REAL NOT NULL,
    photo_count INTEGER NOT NULL DEFAULT 0
);

-- Photos: one row per indexed file
CREATE TABLE IF NOT EXISTS photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT NOT NULL,
    filepath TEXT NOT NULL UNIQUE,
    folder_path TEXT,             -- relative to the photo root, '' for the root itself
    thumbnail_path TEXT,
    creation_date TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,

    -- Capture metadata
    gps_latitude REAL,
    gps_longitude REAL,
    camera_model TEXT,
    focal_length REAL,
    lens_model TEXT,

    album_id INTEGER,
    gps_cluster_id INTEGER,
    indexed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,

    FOREIGN KEY (album_id) REFERENCES albums(id) ON DELETE SET NULL,
    FOREIGN KEY (gps_cluster_id) REFERENCES gps_clusters(id)
);

CREATE INDEX IF NOT EXISTS idx_photos_folder ON photos(folder_path);
CREATE INDEX IF NOT EXISTS idx_photos_creation_date ON photos(creation_date);
CREATE INDEX IF NOT EXISTS idx_photos_album ON photos(album_id);
CREATE INDEX IF NOT EXISTS idx_photos_gps_cluster ON photos(gps_cluster_id);

-- Scan history. A 'running' row doubles as the cross-process run token.
CREATE TABLE IF NOT EXISTS scans (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    root TEXT NOT NULL,
    started_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    heartbeat_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    completed_at TEXT,
    status TEXT NOT NULL DEFAULT 'running',  -- 'running', 'completed', 'failed'
    photos_indexed INTEGER NOT NULL DEFAULT 0,
    photos_failed INTEGER NOT NULL DEFAULT 0,
    clusters_created INTEGER NOT NULL DEFAULT 0,
    error_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_scans_status ON scans(status);
"#;
