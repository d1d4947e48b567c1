//! CSV loaders for fleets and job schedules.
//!
//! # Fleet format
//!
//! ```csv
//! tug_id,class,horsepower,company,shift,lat,lon,auxiliary
//! 1,117,1800,0,day,22.615,120.265,false
//! 2,130,6400,1,night,22.560,120.310,false
//! ```
//!
//! `shift` is `day`, `night` or `always`.  `auxiliary` may be omitted.
//!
//! # Schedule format
//!
//! ```csv
//! task_id,ship_id,weight,tug_count,movement,origin,destination,start_min,wind_speed,required
//! 1,501,12000,2,in,0,3,480,4.2,
//! 2,502,52000,1,out,5,0,510,2.0,120;130
//! ```
//!
//! `start_min` is minutes since day 0, 00:00.  `required` is optional; when
//! empty the requirement comes from the weight bracket table.

use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use tug_core::{CompanyId, GeoPoint, PierId, ShipId, SimTime, TaskId, TugId, parse_class_list, wind_level};

use crate::{DutyShift, ModelError, ModelResult, Movement, Ship, Task, Tug};

// ── CSV records ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct TugRecord {
    tug_id:     u32,
    class:      u16,
    horsepower: u32,
    company:    u16,
    shift:      String,
    lat:        f64,
    lon:        f64,
    #[serde(default)]
    auxiliary:  bool,
}

#[derive(Deserialize)]
struct TaskRecord {
    task_id:     i32,
    ship_id:     u32,
    weight:      f64,
    tug_count:   usize,
    movement:    String,
    origin:      u32,
    destination: u32,
    start_min:   i64,
    #[serde(default)]
    wind_speed:  f64,
    #[serde(default)]
    required:    Option<String>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Load a fleet from a CSV file.
pub fn load_tugs_csv(path: &Path) -> ModelResult<Vec<Tug>> {
    let file = std::fs::File::open(path).map_err(ModelError::Io)?;
    load_tugs_reader(file)
}

/// Like [`load_tugs_csv`] but accepts any `Read` source.
pub fn load_tugs_reader<R: Read>(reader: R) -> ModelResult<Vec<Tug>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut tugs = Vec::new();

    for result in csv_reader.deserialize::<TugRecord>() {
        let row = result.map_err(|e| ModelError::Parse(e.to_string()))?;
        let class = tug_core::CapabilityClass::from_code(row.class)?;
        let shift: DutyShift = row.shift.parse()?;
        let mut tug = Tug::new(TugId(row.tug_id), class, row.horsepower, GeoPoint::new(row.lat, row.lon))
            .with_company(CompanyId(row.company))
            .with_shift(shift);
        if row.auxiliary {
            tug = tug.auxiliary();
        }
        tugs.push(tug);
    }

    Ok(tugs)
}

/// Load a job schedule from a CSV file.
pub fn load_tasks_csv(path: &Path) -> ModelResult<Vec<Task>> {
    let file = std::fs::File::open(path).map_err(ModelError::Io)?;
    load_tasks_reader(file)
}

/// Like [`load_tasks_csv`] but accepts any `Read` source.
pub fn load_tasks_reader<R: Read>(reader: R) -> ModelResult<Vec<Task>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut tasks = Vec::new();

    for result in csv_reader.deserialize::<TaskRecord>() {
        let row = result.map_err(|e| ModelError::Parse(e.to_string()))?;
        if row.task_id <= 0 {
            return Err(ModelError::Parse(format!(
                "task_id {} must be positive; negative ids are reserved for derived jobs",
                row.task_id
            )));
        }
        let movement: Movement = row.movement.parse()?;
        let ship = Ship { id: ShipId(row.ship_id), weight: row.weight };

        let explicit = row
            .required
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(parse_class_list)
            .transpose()?;

        let task = match explicit {
            Some(required) if !required.is_empty() => Task::new(
                TaskId(row.task_id),
                ship,
                movement,
                PierId(row.origin),
                PierId(row.destination),
                SimTime(row.start_min),
                1,
            )?
            .with_required(required),
            _ => Task::new(
                TaskId(row.task_id),
                ship,
                movement,
                PierId(row.origin),
                PierId(row.destination),
                SimTime(row.start_min),
                row.tug_count,
            )?,
        };
        tasks.push(task.with_wind_level(wind_level(row.wind_speed)));
    }

    Ok(tasks)
}
