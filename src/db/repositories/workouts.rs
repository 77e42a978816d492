use anyhow::{anyhow, bail, Result};
use chrono::{TimeZone, Utc};
use rusqlite::{params, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    helpers::{format_datetime, parse_category, parse_datetime, parse_uuid, to_i64, to_u64},
    Database,
};
use crate::models::{group_by_day, summarize, StatisticsByCategory, WorkoutGroup, WorkoutRecord};

const WORKOUT_COLUMNS: &str = "id, category, duration_secs, start_date, notes";

fn row_to_workout(row: &Row) -> Result<WorkoutRecord> {
    let id: String = row.get("id")?;
    let category: String = row.get("category")?;
    let duration_secs: i64 = row.get("duration_secs")?;
    let start_date: String = row.get("start_date")?;

    Ok(WorkoutRecord {
        id: parse_uuid(&id)?,
        category: parse_category(&category)?,
        duration_secs: to_u64(duration_secs, "duration_secs")?,
        start_date: parse_datetime(&start_date, "start_date")?,
        notes: row.get("notes")?,
    })
}

fn ensure_recordable(record: &WorkoutRecord) -> Result<()> {
    if !record.category.is_recordable() {
        bail!("workout {} carries the aggregate category", record.id);
    }
    Ok(())
}

impl Database {
    pub async fn insert_workout(&self, workout: &WorkoutRecord) -> Result<()> {
        ensure_recordable(workout)?;
        let record = workout.clone();
        self.execute(move |conn| {
            let now = format_datetime(&Utc::now());
            conn.execute(
                "INSERT INTO workouts (id, category, duration_secs, start_date, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.id.to_string(),
                    record.category.as_str(),
                    to_i64(record.duration_secs)?,
                    format_datetime(&record.start_date),
                    record.notes,
                    now,
                    now,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_workout(&self, id: Uuid) -> Result<Option<WorkoutRecord>> {
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = ?1"
            ))?;

            let workout = stmt
                .query_row(params![id.to_string()], |row| Ok(row_to_workout(row)))
                .optional()?
                .transpose()?;
            Ok(workout)
        })
        .await
    }

    /// All workouts, newest first.
    pub async fn list_workouts(&self) -> Result<Vec<WorkoutRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WORKOUT_COLUMNS} FROM workouts ORDER BY start_date DESC"
            ))?;

            let mut rows = stmt.query([])?;
            let mut workouts = Vec::new();
            while let Some(row) = rows.next()? {
                workouts.push(row_to_workout(row)?);
            }
            Ok(workouts)
        })
        .await
    }

    pub async fn recent_workouts(&self, limit: usize) -> Result<Vec<WorkoutRecord>> {
        let limit = i64::try_from(limit).map_err(|_| anyhow!("limit {limit} is too large"))?;
        self.execute(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {WORKOUT_COLUMNS} FROM workouts ORDER BY start_date DESC LIMIT ?1"
            ))?;

            let mut rows = stmt.query(params![limit])?;
            let mut workouts = Vec::new();
            while let Some(row) = rows.next()? {
                workouts.push(row_to_workout(row)?);
            }
            Ok(workouts)
        })
        .await
    }

    /// Overwrite category, duration, start date and notes of a stored workout.
    pub async fn update_workout(&self, workout: &WorkoutRecord) -> Result<()> {
        ensure_recordable(workout)?;
        let record = workout.clone();
        self.execute(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE workouts
                 SET category = ?1,
                     duration_secs = ?2,
                     start_date = ?3,
                     notes = ?4,
                     updated_at = ?5
                 WHERE id = ?6",
                params![
                    record.category.as_str(),
                    to_i64(record.duration_secs)?,
                    format_datetime(&record.start_date),
                    record.notes,
                    format_datetime(&Utc::now()),
                    record.id.to_string(),
                ],
            )?;

            if rows_affected == 0 {
                return Err(anyhow!("Workout {} not found", record.id));
            }
            Ok(())
        })
        .await
    }

    /// Returns whether a row was removed; deleting a missing workout is not an error.
    pub async fn delete_workout(&self, id: Uuid) -> Result<bool> {
        self.execute(move |conn| {
            let rows_affected =
                conn.execute("DELETE FROM workouts WHERE id = ?1", params![id.to_string()])?;
            Ok(rows_affected > 0)
        })
        .await
    }

    pub async fn statistics_by_category(&self) -> Result<StatisticsByCategory> {
        let rows = self
            .execute(|conn| {
                let mut stmt = conn.prepare("SELECT category, duration_secs FROM workouts")?;
                let mut rows = stmt.query([])?;
                let mut pairs = Vec::new();
                while let Some(row) = rows.next()? {
                    let category: String = row.get(0)?;
                    let duration_secs: i64 = row.get(1)?;
                    pairs.push((
                        parse_category(&category)?,
                        to_u64(duration_secs, "duration_secs")?,
                    ));
                }
                Ok(pairs)
            })
            .await?;

        Ok(summarize(rows))
    }

    /// Stored workouts grouped by the calendar day they started in `tz`.
    pub async fn history<Tz: TimeZone>(&self, tz: &Tz) -> Result<Vec<WorkoutGroup>> {
        let workouts = self.list_workouts().await?;
        Ok(group_by_day(workouts, tz))
    }
}
