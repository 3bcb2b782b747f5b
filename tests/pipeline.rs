use galaxy::{OutputRecord, Pipeline, PipelineConfig, PipelineEvent};
use rand::prelude::*;
use std::cell::RefCell;
use std::collections::HashSet;
use std::path::Path;

const HEADER: &str = "valence,year,acousticness,artists,danceability,duration_ms,energy,explicit,id,instrumentalness,key,liveness,loudness,mode,name,popularity,release_date,speechiness,tempo";

fn write_tracks(path: &Path, cnt: usize, seed: u64) {
    let mut rnd = StdRng::seed_from_u64(seed);
    let mut content = String::from(HEADER);
    for i in 0..cnt {
        let year = 1960 + (i % 40);
        // every 50th row misses its energy value
        let energy = if i % 50 == 49 { String::new() } else { format!("{:.3}", rnd.gen_range(0.0..1.0)) };
        content.push_str(&format!(
            "\n{:.3},{},{:.3},\"['Artist {}', 'Guest']\",{:.3},200000,{},0,id{},{:.3},5,{:.3},{:.2},1,Song {},{},{},{:.3},{:.1}",
            rnd.gen_range(0.0..1.0), year, rnd.gen_range(0.0..1.0), i % 17, rnd.gen_range(0.0..1.0), energy, i,
            rnd.gen_range(0.0..1.0), rnd.gen_range(0.0..1.0), rnd.gen_range(-40.0..0.0), i, rnd.gen_range(0..100),
            year, rnd.gen_range(0.0..0.5), rnd.gen_range(60.0..200.0),
        ));
    }
    std::fs::write(path, content).unwrap();
}

fn config(dir: &Path, output: &str) -> PipelineConfig {
    PipelineConfig {
        input_path: dir.join("data.csv"),
        output_path: dir.join(output),
        global_cap: 1000,
        per_group_cap: 30,
        ..Default::default()
    }
}

fn read_output(path: &Path) -> Vec<OutputRecord> {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn process_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    write_tracks(&dir.path().join("data.csv"), 2000, 1);

    let events = RefCell::new(Vec::new());
    let observer = |event: &PipelineEvent| events.borrow_mut().push(event.clone());
    let pipeline = Pipeline::new(config(dir.path(), "galaxy_data.json")).unwrap().observer(&observer);
    let written = pipeline.process_file().unwrap();

    // 40 rows dropped, every year keeps at least 30 rows -> 40 * 30 = 1200, thinned to 1000
    assert_eq!(written, 1000);
    let records = read_output(&dir.path().join("galaxy_data.json"));
    assert_eq!(records.len(), 1000);

    let ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids.len(), records.len());
    assert!(records.iter().all(|r| r.cluster < 8 && r.position.len() == 3));
    assert!(records.iter().all(|r| !r.artist.contains('[') && !r.artist.contains('\'')));
    assert!(records.iter().all(|r| r.id.parse::<usize>().unwrap() % 50 != 49));

    let events = events.into_inner();
    assert_eq!(events.first(), Some(&PipelineEvent::Loaded { rows: 1960, dropped: 40 }));
    assert_eq!(events[1], PipelineEvent::Sampled { input: 1960, working_set: 1000 });
    assert!(matches!(events.last(), Some(PipelineEvent::Written { records: 1000, .. })));
}

#[test]
fn identical_runs_produce_identical_documents() {
    let dir = tempfile::tempdir().unwrap();
    write_tracks(&dir.path().join("data.csv"), 1500, 2);

    Pipeline::new(config(dir.path(), "a.json")).unwrap().process_file().unwrap();
    Pipeline::new(config(dir.path(), "b.json")).unwrap().process_file().unwrap();
    let a = std::fs::read(dir.path().join("a.json")).unwrap();
    let b = std::fs::read(dir.path().join("b.json")).unwrap();
    assert_eq!(a, b);

    let other_seed = PipelineConfig { seed: 7, ..config(dir.path(), "c.json") };
    Pipeline::new(other_seed).unwrap().process_file().unwrap();
    assert_ne!(a, std::fs::read(dir.path().join("c.json")).unwrap());
}

#[test]
fn small_input_is_used_completely() {
    let dir = tempfile::tempdir().unwrap();
    write_tracks(&dir.path().join("data.csv"), 6, 3);

    let pipeline = Pipeline::new(config(dir.path(), "galaxy_data.json")).unwrap();
    assert_eq!(pipeline.process_file().unwrap(), 6);

    let records = read_output(&dir.path().join("galaxy_data.json"));
    let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["0", "1", "2", "3", "4", "5"]);
    // fewer rows than clusters: every row ends up in its own cluster
    let clusters: HashSet<usize> = records.iter().map(|r| r.cluster).collect();
    assert_eq!(clusters.len(), 6);
    assert!(records.iter().all(|r| r.cluster < 6));
}

#[test]
fn missing_columns_abort_without_output() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("data.csv"), "name,artists,year\nA,B,2000\n").unwrap();

    let pipeline = Pipeline::new(config(dir.path(), "galaxy_data.json")).unwrap();
    assert!(matches!(pipeline.process_file(), Err(galaxy::Error::MissingColumns(_))));
    assert!(!dir.path().join("galaxy_data.json").exists());
}
