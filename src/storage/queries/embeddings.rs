//! Embedding row queries.
//!
//! Rows are keyed by `content`; writes are upserts.

use rusqlite::{params, Connection, Result, Row};

use super::{decode_vector, encode_vector};
use crate::domain::{EmbeddingRecord, StoredEmbedding, MEAN_EMBEDDING_LABEL};

/// Inserts a row or overwrites the one with the same `content`.
///
/// A row that already carries a `post_id` keeps it when the new record has
/// none.
pub fn upsert(conn: &Connection, record: &EmbeddingRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO embeddings (content, embedding, post_id) VALUES (?1, ?2, ?3)
         ON CONFLICT(content) DO UPDATE SET
             embedding = excluded.embedding,
             post_id = COALESCE(excluded.post_id, embeddings.post_id)",
        params![
            record.content,
            encode_vector(&record.embedding)?,
            record.post_id
        ],
    )?;
    Ok(())
}

/// Upserts every record in order.
pub fn upsert_many(conn: &Connection, records: &[EmbeddingRecord]) -> Result<()> {
    records.iter().try_for_each(|record| upsert(conn, record))
}

/// Gets every row in insertion order.
pub fn get_all(conn: &Connection) -> Result<Vec<StoredEmbedding>> {
    let mut stmt =
        conn.prepare("SELECT content, embedding, post_id FROM embeddings ORDER BY rowid")?;
    let rows = stmt.query_map([], map_row)?;
    rows.collect()
}

/// Gets the post-linked rows that carry a vector, in insertion order.
///
/// Vocabulary rows and the mean row are left out.
pub fn get_candidates(conn: &Connection) -> Result<Vec<StoredEmbedding>> {
    let mut stmt = conn.prepare(
        "SELECT content, embedding, post_id FROM embeddings
         WHERE post_id IS NOT NULL AND embedding IS NOT NULL AND content <> ?1
         ORDER BY rowid",
    )?;
    let rows = stmt.query_map(params![MEAN_EMBEDDING_LABEL], map_row)?;
    rows.collect()
}

fn map_row(row: &Row<'_>) -> Result<StoredEmbedding> {
    Ok(StoredEmbedding {
        content: row.get(0)?,
        embedding: decode_vector(1, row.get(1)?)?,
        post_id: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PostId;
    use crate::storage::schema;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for migration in schema::all_migrations() {
            conn.execute_batch(migration).unwrap();
        }
        conn
    }

    #[test]
    fn upsert_twice_keeps_one_row() {
        let conn = setup();
        let record = EmbeddingRecord::token("sun", vec![1.0, 0.0]);

        upsert(&conn, &record).unwrap();
        upsert(&conn, &record).unwrap();

        assert_eq!(get_all(&conn).unwrap().len(), 1);
    }

    #[test]
    fn upsert_overwrites_vector() {
        let conn = setup();
        upsert(&conn, &EmbeddingRecord::mean(vec![0.0, 0.0])).unwrap();
        upsert(&conn, &EmbeddingRecord::mean(vec![0.5, 0.5])).unwrap();

        let rows = get_all(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].embedding, Some(vec![0.5, 0.5]));
        assert!(rows[0].is_mean());
    }

    #[test]
    fn upsert_keeps_existing_post_link() {
        let conn = setup();
        upsert(&conn, &EmbeddingRecord::post(PostId::from(3), vec![1.0])).unwrap();
        upsert(&conn, &EmbeddingRecord::token("post:3", vec![2.0])).unwrap();

        let rows = get_all(&conn).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].post_id, Some(PostId::Number(3)));
        assert_eq!(rows[0].embedding, Some(vec![2.0]));
    }

    #[test]
    fn get_all_in_insertion_order() {
        let conn = setup();
        upsert_many(
            &conn,
            &[
                EmbeddingRecord::token("b", vec![0.0]),
                EmbeddingRecord::token("a", vec![1.0]),
            ],
        )
        .unwrap();

        let labels: Vec<String> = get_all(&conn)
            .unwrap()
            .into_iter()
            .map(|row| row.content)
            .collect();
        assert_eq!(labels, vec!["b", "a"]);
    }

    #[test]
    fn candidates_are_post_rows_only() {
        let conn = setup();
        upsert_many(
            &conn,
            &[
                EmbeddingRecord::token("a", vec![1.0]),
                EmbeddingRecord::post(PostId::from(7), vec![0.5]),
                EmbeddingRecord::mean(vec![0.2]),
                EmbeddingRecord::post(PostId::from("intro"), vec![0.1]),
            ],
        )
        .unwrap();

        let ids: Vec<Option<PostId>> = get_candidates(&conn)
            .unwrap()
            .into_iter()
            .map(|row| row.post_id)
            .collect();
        assert_eq!(
            ids,
            vec![Some(PostId::from(7)), Some(PostId::from("intro"))]
        );
    }
}
