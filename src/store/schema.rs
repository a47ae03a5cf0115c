//! Table definitions
//!
//! Statuses and enums are SMALLINT ids, entity ids are ULID text.

use sqlx::PgPool;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS customers_tb (
        id              TEXT PRIMARY KEY,
        customer_number TEXT NOT NULL UNIQUE,
        customer_type   SMALLINT NOT NULL,
        company_name    TEXT,
        first_name      TEXT,
        last_name       TEXT,
        email           TEXT NOT NULL,
        phone           TEXT NOT NULL,
        address         TEXT NOT NULL,
        city            TEXT NOT NULL,
        province        TEXT NOT NULL,
        postal_code     TEXT,
        status          SMALLINT NOT NULL,
        credit_rating   SMALLINT,
        credit_limit    NUMERIC(14, 2) NOT NULL DEFAULT 0,
        notes           TEXT,
        created_by      TEXT,
        updated_by      TEXT,
        created_at      TIMESTAMPTZ NOT NULL,
        updated_at      TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_customers_email ON customers_tb (LOWER(email))",
    "CREATE INDEX IF NOT EXISTS idx_customers_type_status ON customers_tb (customer_type, status)",
    r#"
    CREATE TABLE IF NOT EXISTS orders_tb (
        id                  TEXT PRIMARY KEY,
        order_number        TEXT NOT NULL UNIQUE,
        customer_id         TEXT NOT NULL,
        status              SMALLINT NOT NULL,
        priority            SMALLINT NOT NULL,
        payment_status      SMALLINT NOT NULL,
        cargo_name          TEXT NOT NULL,
        cargo_weight        NUMERIC(14, 3) NOT NULL,
        cargo_volume        NUMERIC(14, 3) NOT NULL,
        origin_address      TEXT NOT NULL,
        destination_address TEXT NOT NULL,
        total_amount        NUMERIC(14, 2) NOT NULL,
        pickup_time         TIMESTAMPTZ,
        delivery_time       TIMESTAMPTZ,
        expected_time       TIMESTAMPTZ,
        notes               TEXT,
        updated_by          TEXT,
        created_at          TIMESTAMPTZ NOT NULL,
        updated_at          TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_orders_status ON orders_tb (status)",
    "CREATE INDEX IF NOT EXISTS idx_orders_customer ON orders_tb (customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_orders_created ON orders_tb (created_at)",
    r#"
    CREATE TABLE IF NOT EXISTS vehicles_tb (
        id            TEXT PRIMARY KEY,
        license_plate TEXT NOT NULL UNIQUE,
        vehicle_type  SMALLINT NOT NULL,
        max_load      NUMERIC(14, 3) NOT NULL,
        max_volume    NUMERIC(14, 3) NOT NULL,
        status        SMALLINT NOT NULL,
        driver_id     TEXT,
        is_active     BOOLEAN NOT NULL DEFAULT TRUE,
        created_at    TIMESTAMPTZ NOT NULL,
        updated_at    TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS drivers_tb (
        id             TEXT PRIMARY KEY,
        name           TEXT NOT NULL,
        phone          TEXT NOT NULL,
        license_number TEXT NOT NULL,
        status         SMALLINT NOT NULL,
        created_at     TIMESTAMPTZ NOT NULL,
        updated_at     TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS dispatches_tb (
        id                 TEXT PRIMARY KEY,
        dispatch_number    TEXT NOT NULL UNIQUE,
        vehicle_id         TEXT NOT NULL,
        driver_id          TEXT NOT NULL,
        status             SMALLINT NOT NULL,
        planned_departure  TIMESTAMPTZ NOT NULL,
        estimated_duration NUMERIC(10, 2),
        estimated_distance NUMERIC(12, 2),
        departed_at        TIMESTAMPTZ,
        arrived_at         TIMESTAMPTZ,
        completed_at       TIMESTAMPTZ,
        cancelled_at       TIMESTAMPTZ,
        cancel_reason      TEXT,
        actual_distance    NUMERIC(12, 2),
        actual_duration    NUMERIC(10, 2),
        created_at         TIMESTAMPTZ NOT NULL,
        updated_at         TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS shipments_tb (
        id                  TEXT PRIMARY KEY,
        shipment_number     TEXT NOT NULL UNIQUE,
        order_id            TEXT NOT NULL,
        dispatch_id         TEXT,
        vehicle_id          TEXT NOT NULL,
        driver_id           TEXT,
        status              SMALLINT NOT NULL,
        sequence            INTEGER NOT NULL,
        estimated_departure TIMESTAMPTZ NOT NULL,
        estimated_arrival   TIMESTAMPTZ NOT NULL,
        created_at          TIMESTAMPTZ NOT NULL,
        updated_at          TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_shipments_dispatch ON shipments_tb (dispatch_id)",
    "CREATE INDEX IF NOT EXISTS idx_shipments_order ON shipments_tb (order_id)",
    "CREATE INDEX IF NOT EXISTS idx_shipments_driver_status ON shipments_tb (driver_id, status)",
    "CREATE INDEX IF NOT EXISTS idx_shipments_vehicle_status ON shipments_tb (vehicle_id, status)",
    r#"
    CREATE TABLE IF NOT EXISTS pods_tb (
        id                 TEXT PRIMARY KEY,
        pod_number         TEXT NOT NULL UNIQUE,
        order_id           TEXT NOT NULL,
        status             SMALLINT NOT NULL,
        file_name          TEXT NOT NULL,
        original_name      TEXT NOT NULL,
        file_path          TEXT NOT NULL,
        file_url           TEXT NOT NULL,
        file_size          BIGINT NOT NULL,
        mime_type          TEXT NOT NULL,
        checksum           TEXT NOT NULL,
        receiver_name      TEXT,
        receiver_signature TEXT,
        delivery_photo     TEXT,
        delivery_time      TIMESTAMPTZ NOT NULL,
        notes              TEXT,
        uploaded_by        TEXT,
        verified_by        TEXT,
        verified_at        TIMESTAMPTZ,
        rejection_reason   TEXT,
        created_at         TIMESTAMPTZ NOT NULL,
        updated_at         TIMESTAMPTZ NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tracking_points_tb (
        id            TEXT PRIMARY KEY,
        shipment_id   TEXT NOT NULL,
        latitude      DOUBLE PRECISION NOT NULL,
        longitude     DOUBLE PRECISION NOT NULL,
        speed         DOUBLE PRECISION NOT NULL,
        heading       DOUBLE PRECISION NOT NULL,
        altitude      DOUBLE PRECISION,
        battery_level DOUBLE PRECISION,
        recorded_at   TIMESTAMPTZ NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tracking_shipment_time ON tracking_points_tb (shipment_id, recorded_at)",
];

/// Create missing tables and indexes
pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for ddl in TABLES {
        sqlx::query(ddl).execute(pool).await?;
    }
    tracing::info!(statements = TABLES.len(), "Database schema ready");
    Ok(())
}
