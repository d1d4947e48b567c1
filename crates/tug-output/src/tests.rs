//! Integration tests for tug-output.

#[cfg(test)]
mod csv_tests {
    use tempfile::TempDir;
    use tug_core::{CapabilityClass, CompanyId, ShipId, SimTime, TaskId, TugId};
    use tug_model::{Movement, TaskState};
    use tug_sim::{MatchCounts, TaskOutcome};

    use crate::csv::CsvWriter;
    use crate::row::{EventRow, TaskRow};
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn headers(dir: &TempDir, file: &str) -> Vec<String> {
        let mut rdr = csv::Reader::from_path(dir.path().join(file)).unwrap();
        rdr.headers().unwrap().iter().map(str::to_owned).collect()
    }

    fn outcome() -> TaskOutcome {
        TaskOutcome {
            task:            TaskId(4),
            ship:            ShipId(40),
            movement:        Movement::Outbound,
            state:           TaskState::Processed,
            scheduled_start: SimTime(100),
            realized_start:  SimTime(110),
            end:             SimTime(170),
            required:        vec![CapabilityClass::T118, CapabilityClass::T117],
            tugs:            vec![(TugId(3), CapabilityClass::T119), (TugId(1), CapabilityClass::T117)],
            company:         Some(CompanyId(2)),
            temporary_need:  false,
            moving_cost:     12.5,
            moving_minutes:  30,
            waiting_minutes: 10,
            waiting_cost:    1000.0,
            revenue:         18241.0,
            profit:          17228.5,
            matches:         MatchCounts { exact: 1, over: 1, under: 0 },
        }
    }

    #[test]
    fn csv_files_created() {
        let dir = tmp();
        let _w = CsvWriter::new(dir.path()).unwrap();
        assert!(dir.path().join("task_outcomes.csv").exists());
        assert!(dir.path().join("run_summary.csv").exists());
        assert!(dir.path().join("event_log.csv").exists());
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = tmp();
        let nested = dir.path().join("runs").join("greedy");
        let _w = CsvWriter::new(&nested).unwrap();
        assert!(nested.join("event_log.csv").exists());
    }

    #[test]
    fn csv_headers_correct() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();

        assert_eq!(headers(&dir, "event_log.csv"), ["time", "task_id", "kind", "detail", "outcome"]);
        assert_eq!(headers(&dir, "task_outcomes.csv")[..4], ["task_id", "ship_id", "movement", "state"]);
        assert_eq!(headers(&dir, "run_summary.csv").len(), 17);
    }

    #[test]
    fn task_rows_carry_class_lists() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_tasks(&[TaskRow::from(&outcome())]).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("task_outcomes.csv")).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "4");
        assert_eq!(&rows[0][2], "out");
        assert_eq!(&rows[0][3], "processed");
        assert_eq!(&rows[0][7], "118;117"); // required, as booked
        assert_eq!(&rows[0][8], "119;117"); // assigned
        assert_eq!(&rows[0][9], "3;1");
        assert_eq!(&rows[0][10], "2");
        assert_eq!(&rows[0][12], "12.50");
    }

    #[test]
    fn routine_events_have_no_task() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        let row = EventRow { time: 60, task: None, kind: "routine", detail: String::new(), outcome: "redispatch" };
        w.write_events(&[row]).unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join("event_log.csv")).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(&rows[0][0], "60");
        assert_eq!(&rows[0][1], "");
        assert_eq!(&rows[0][2], "routine");
    }

    #[test]
    fn csv_finish_idempotent() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap(); // second call should not panic
    }

    #[test]
    fn csv_empty_batches_ok() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_events(&[]).unwrap();
        w.write_tasks(&[]).unwrap();
    }
}

// ── Observer ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod observer_tests {
    use tempfile::TempDir;
    use tug_core::{CapabilityClass, GeoPoint, PierId, ShipId, SimTime, TaskId, TugId};
    use tug_dispatch::GreedyProfit;
    use tug_event::EventKind;
    use tug_model::{Movement, Ship, Task, Tug};
    use tug_port::{FixedPredictor, PierMap, PortServices};
    use tug_sim::{ScriptedEvent, SimBuilder, SimOptions};

    use crate::row::{EventRow, SummaryRow, TaskRow};
    use crate::writer::OutputWriter;
    use crate::{CsvWriter, EventLogObserver, OutputError, OutputResult};

    const PIER: GeoPoint = GeoPoint { lat: 22.60, lon: 120.28 };

    fn read(dir: &TempDir, file: &str) -> Vec<csv::StringRecord> {
        let mut rdr = csv::Reader::from_path(dir.path().join(file)).unwrap();
        rdr.records().map(|r| r.unwrap()).collect()
    }

    fn job(id: i32, start: i64) -> Task {
        Task::new(
            TaskId(id),
            Ship { id: ShipId(id as u32), weight: 3_000.0 },
            Movement::Inbound,
            PierId(0),
            PierId(0),
            SimTime(start),
            1,
        )
        .unwrap()
    }

    fn sim(scripted: Vec<ScriptedEvent>) -> tug_sim::Simulator {
        let services = PortServices::new(PierMap::new([(PierId(0), PIER)], PIER), FixedPredictor(60));
        SimBuilder::new(
            SimOptions::default(),
            vec![job(1, 120), job(2, 300)],
            vec![Tug::new(TugId(0), CapabilityClass::T117, 2_400, PIER)],
            GreedyProfit::default(),
            services,
        )
        .scripted(scripted)
        .build()
        .unwrap()
    }

    /// Fails every event write.
    struct Broken;

    impl OutputWriter for Broken {
        fn write_events(&mut self, _rows: &[EventRow]) -> OutputResult<()> {
            Err(OutputError::Io(std::io::Error::other("disk full")))
        }

        fn write_tasks(&mut self, _rows: &[TaskRow]) -> OutputResult<()> {
            Ok(())
        }

        fn write_summary(&mut self, _row: &SummaryRow) -> OutputResult<()> {
            Ok(())
        }

        fn finish(&mut self) -> OutputResult<()> {
            Ok(())
        }
    }

    #[test]
    fn integration_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut obs = EventLogObserver::new(CsvWriter::new(dir.path()).unwrap());
        let cancel = ScriptedEvent { task: Some(TaskId(2)), time: SimTime(250), kind: EventKind::Cancel };
        let result = sim(vec![cancel]).run(&mut obs).unwrap();
        assert!(obs.take_error().is_none(), "no write errors expected");

        // Job 1: confirm, start, end.  Job 2: cancel; its Confirm and
        // StartWork find it finished and are not logged.
        let events = read(&dir, "event_log.csv");
        assert_eq!(events.len(), 4);
        assert_eq!(obs.rows_written(), 4);
        let kinds: Vec<&str> = events.iter().map(|r| r.get(2).unwrap_or_default()).collect();
        assert_eq!(kinds, ["confirm", "start_work", "end_work", "cancel"]);

        let tasks = read(&dir, "task_outcomes.csv");
        assert_eq!(tasks.len(), 2);
        assert_eq!(&tasks[0][3], "processed");
        assert_eq!(&tasks[1][3], "canceled");

        let summary = read(&dir, "run_summary.csv");
        assert_eq!(summary.len(), 1);
        assert_eq!(&summary[0][0], "greedy_profit");
        assert_eq!(&summary[0][2], result.completed.to_string().as_str());
        assert_eq!(&summary[0][3], "1");
    }

    #[test]
    fn deferrals_are_logged() {
        let dir = tempfile::tempdir().unwrap();
        let mut obs = EventLogObserver::new(CsvWriter::new(dir.path()).unwrap());
        // Job 1 needs a second tug from 110 on; the fleet has one.
        let change = ScriptedEvent {
            task: Some(TaskId(1)),
            time: SimTime(110),
            kind: EventKind::RequirementChange { required: vec![CapabilityClass::T117; 2] },
        };
        let cancel = ScriptedEvent { task: Some(TaskId(1)), time: SimTime(135), kind: EventKind::Cancel };
        sim(vec![change, cancel]).run(&mut obs).unwrap();
        assert!(obs.take_error().is_none());

        let deferred: Vec<_> = read(&dir, "event_log.csv")
            .into_iter()
            .filter(|r| &r[4] == "deferred")
            .collect();
        assert_eq!(deferred.len(), 2); // at 120 and 130
        assert_eq!(&deferred[0][3], "1");
        assert_eq!(&deferred[1][3], "2");
    }

    #[test]
    fn first_write_error_is_kept() {
        let mut obs = EventLogObserver::new(Broken);
        sim(vec![]).run(&mut obs).unwrap();
        let err = obs.take_error().expect("stored error");
        assert!(err.to_string().contains("disk full"));
        assert!(obs.take_error().is_none());
        assert_eq!(obs.rows_written(), 0);
    }
}
