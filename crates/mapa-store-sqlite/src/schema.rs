//! SQL schema for the MetaMapa SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Facts are never deleted; review_state = 'deleted' is the soft mark.
CREATE TABLE IF NOT EXISTS facts (
    fact_id      TEXT PRIMARY KEY,
    fingerprint  TEXT NOT NULL,
    title        TEXT NOT NULL,
    description  TEXT NOT NULL,
    category     TEXT NOT NULL,
    occurred_at  TEXT NOT NULL,
    ingested_at  TEXT NOT NULL,   -- server-assigned on first admission
    updated_at   TEXT NOT NULL,
    tags         TEXT NOT NULL DEFAULT '[]',
    location     TEXT,            -- JSON-encoded Location or NULL
    contributor  TEXT,
    review_state TEXT NOT NULL DEFAULT 'pending',
    suggestion   TEXT,
    provenance   TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE IF NOT EXISTS collections (
    collection_id TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    description   TEXT NOT NULL,
    algorithm     TEXT NOT NULL,
    criteria      TEXT NOT NULL DEFAULT '[]',
    administrator TEXT,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

-- Derived state: rewritten by every re-evaluation pass.
CREATE TABLE IF NOT EXISTS memberships (
    collection_id TEXT NOT NULL REFERENCES collections(collection_id),
    fact_id       TEXT NOT NULL REFERENCES facts(fact_id),
    verdict       TEXT NOT NULL,  -- 'pending' | 'accepted' | 'excluded'
    evaluated_at  TEXT NOT NULL,
    PRIMARY KEY (collection_id, fact_id)
);

CREATE TABLE IF NOT EXISTS deletion_requests (
    request_id   TEXT PRIMARY KEY,
    fact_id      TEXT NOT NULL REFERENCES facts(fact_id),
    reason       TEXT NOT NULL,
    requester    TEXT,
    state        TEXT NOT NULL,   -- 'pending' | 'approved' | 'rejected'
    spam         INTEGER NOT NULL DEFAULT 0,
    rejection    TEXT,            -- JSON-encoded RejectionReason or NULL
    submitted_at TEXT NOT NULL,
    resolved_at  TEXT
);

-- Last successful pull per source.
CREATE TABLE IF NOT EXISTS sources (
    source_id  TEXT PRIMARY KEY,
    checkpoint TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS facts_fingerprint_idx ON facts(fingerprint);
CREATE INDEX IF NOT EXISTS facts_ingested_idx      ON facts(ingested_at);
CREATE INDEX IF NOT EXISTS deletion_state_idx      ON deletion_requests(state);

PRAGMA user_version = 1;
";
