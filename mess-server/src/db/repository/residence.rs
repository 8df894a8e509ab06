//! Hostel / Student / Gatepass Repository
//!
//! The directory is fed by the identity and gatepass services; the
//! booking service only reads it. The upserts exist for that feed.

use super::RepoResult;
use shared::models::{Gatepass, Hostel, Student};
use sqlx::SqlitePool;

const STUDENT_SELECT: &str = "SELECT id, hostel_id, name, roll_no, floor, room FROM student";

pub async fn find_hostel(pool: &SqlitePool, id: i64) -> RepoResult<Option<Hostel>> {
    let hostel = sqlx::query_as::<_, Hostel>("SELECT id, name FROM hostel WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(hostel)
}

pub async fn find_student(pool: &SqlitePool, id: i64) -> RepoResult<Option<Student>> {
    let sql = format!("{STUDENT_SELECT} WHERE id = ?");
    let student = sqlx::query_as::<_, Student>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(student)
}

pub async fn find_gatepass(
    pool: &SqlitePool,
    hostel_id: i64,
    id: i64,
) -> RepoResult<Option<Gatepass>> {
    let gatepass = sqlx::query_as::<_, Gatepass>(
        "SELECT id, hostel_id, student_id, out_date, in_date, status FROM gatepass WHERE id = ? AND hostel_id = ?",
    )
    .bind(id)
    .bind(hostel_id)
    .fetch_optional(pool)
    .await?;
    Ok(gatepass)
}

pub async fn upsert_hostel(pool: &SqlitePool, hostel: &Hostel) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO hostel (id, name) VALUES (?1, ?2) ON CONFLICT(id) DO UPDATE SET name = excluded.name",
    )
    .bind(hostel.id)
    .bind(&hostel.name)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_student(pool: &SqlitePool, student: &Student) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO student (id, hostel_id, name, roll_no, floor, room) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT(id) DO UPDATE SET hostel_id = excluded.hostel_id, name = excluded.name, roll_no = excluded.roll_no, floor = excluded.floor, room = excluded.room",
    )
    .bind(student.id)
    .bind(student.hostel_id)
    .bind(&student.name)
    .bind(&student.roll_no)
    .bind(student.floor)
    .bind(&student.room)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_gatepass(pool: &SqlitePool, gatepass: &Gatepass) -> RepoResult<()> {
    sqlx::query(
        "INSERT INTO gatepass (id, hostel_id, student_id, out_date, in_date, status) VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT(id) DO UPDATE SET out_date = excluded.out_date, in_date = excluded.in_date, status = excluded.status",
    )
    .bind(gatepass.id)
    .bind(gatepass.hostel_id)
    .bind(gatepass.student_id)
    .bind(&gatepass.out_date)
    .bind(&gatepass.in_date)
    .bind(gatepass.status)
    .execute(pool)
    .await?;
    Ok(())
}
