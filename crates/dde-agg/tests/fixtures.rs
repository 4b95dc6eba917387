#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

/// Description of a synthetic run directory.
#[derive(Debug, Clone)]
pub struct RunFixture {
    pub name: String,
    pub seed: u64,
    pub epochs: u64,
    pub updates_per_epoch: u64,
    pub track_systematics: bool,
    /// Per-population `{task:score}` bodies of the single pathway, e.g. `NOT:10,AND:0`.
    pub task_performance: Vec<String>,
    /// Epochs present in the world evaluation log.
    pub evaluation_epochs: Vec<u64>,
    pub avg_generation: f64,
    pub snapshot: Option<String>,
    /// Replaces the generated world evaluation log verbatim.
    pub evaluation_text: Option<String>,
}

impl RunFixture {
    pub fn new(name: &str, seed: u64) -> Self {
        Self {
            name: name.to_string(),
            seed,
            epochs: 2,
            updates_per_epoch: 10,
            track_systematics: true,
            task_performance: vec![
                "NOT:10,AND:0".to_string(),
                "NOT:0,AND:10".to_string(),
                "NOT:5,AND:5".to_string(),
            ],
            evaluation_epochs: vec![0, 1, 2],
            avg_generation: 4.0,
            snapshot: None,
            evaluation_text: None,
        }
    }

    fn num_pops(&self) -> usize {
        self.task_performance.len()
    }

    fn summary_update(&self) -> u64 {
        if self.track_systematics {
            self.updates_per_epoch
        } else {
            self.updates_per_epoch + 1
        }
    }

    /// Writes the run under `root` and returns its directory.
    pub fn write(&self, root: &Path) -> PathBuf {
        let run_dir = root.join(&self.name);
        let output = run_dir.join("output");
        fs::create_dir_all(&output).expect("create run output dir");
        fs::write(output.join("run_config.csv"), self.run_config()).expect("write run_config");
        fs::write(output.join("world_evaluation.csv"), self.world_evaluation())
            .expect("write world_evaluation");
        fs::write(output.join("world_summary.csv"), self.world_summary())
            .expect("write world_summary");
        if self.track_systematics {
            fs::write(output.join("systematics.csv"), self.systematics())
                .expect("write systematics");
        }
        if let Some(snapshot) = &self.snapshot {
            fs::write(output.join("population_snapshot.csv"), snapshot)
                .expect("write population_snapshot");
        }
        run_dir
    }

    fn run_config(&self) -> String {
        let mut text = String::from("source,parameter,value\n");
        text.push_str(&format!("experiment,SEED,{}\n", self.seed));
        text.push_str("experiment,SELECTION_METHOD,elite\n");
        text.push_str(&format!("experiment,NUM_POPS,{}\n", self.num_pops()));
        text.push_str(&format!(
            "experiment,UPDATES_PER_EPOCH,{}\n",
            self.updates_per_epoch
        ));
        text.push_str(&format!("experiment,EPOCHS,{}\n", self.epochs));
        text.push_str(&format!(
            "experiment,TRACK_SYSTEMATICS,{}\n",
            u8::from(self.track_systematics)
        ));
        for pop in 0..self.num_pops() {
            text.push_str(&format!("world_{pop},world_tasks,\"[(NOT,0),(AND,0)]\"\n"));
            text.push_str(&format!("world_{pop},indiv_tasks,\"[(NOT,0)]\"\n"));
            text.push_str(&format!("world_{pop},world_size,{}\n", 100 + pop));
        }
        text
    }

    fn world_evaluation(&self) -> String {
        if let Some(text) = &self.evaluation_text {
            return text.clone();
        }
        let mut text =
            String::from("epoch,aggregate_scores,scores,selected,num_unique_selected\n");
        for epoch in &self.evaluation_epochs {
            text.push_str(&format!(
                "{epoch},\"[10,10,10]\",\"[[10,0],[0,10],[5,5]]\",\"[0,1,2,2]\",3\n"
            ));
        }
        text
    }

    fn world_summary(&self) -> String {
        let mut text = String::from(
            "epoch,world_id,world_update,num_orgs,avg_generation,avg_cpu_cycles_per_replication,avg_org_fitness,task_performance\n",
        );
        for epoch in 0..=self.epochs {
            for (pop, performance) in self.task_performance.iter().enumerate() {
                text.push_str(&format!(
                    "{epoch},{pop},5,50,1.0,30.0,0.5,\"[{{{performance}}}]\"\n"
                ));
                text.push_str(&format!(
                    "{epoch},{pop},{},100,{},30.0,0.5,\"[{{{performance}}}]\"\n",
                    self.summary_update(),
                    self.avg_generation
                ));
            }
        }
        text
    }

    fn systematics(&self) -> String {
        let fields = [
            "num_taxa",
            "total_orgs",
            "ave_depth",
            "num_roots",
            "mrca_depth",
            "diversity",
            "mean_genotype_pairwise_distance",
            "min_genotype_pairwise_distance",
            "max_genotype_pairwise_distance",
            "variance_genotype_pairwise_distance",
            "genotype_current_phylogenetic_diversity",
        ];
        let mut text = format!("epoch,{}\n", fields.join(","));
        for epoch in 0..=self.epochs {
            let values: Vec<String> = (0..fields.len()).map(|i| (i + 1).to_string()).collect();
            text.push_str(&format!("{epoch},{}\n", values.join(",")));
        }
        text
    }
}

/// Reads a CSV output table into its header and records.
pub fn read_output(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .expect("open output table");
    let header = reader
        .headers()
        .expect("read header")
        .iter()
        .map(str::to_string)
        .collect();
    let rows = reader
        .records()
        .map(|record| {
            record
                .expect("read record")
                .iter()
                .map(str::to_string)
                .collect()
        })
        .collect();
    (header, rows)
}

/// Returns the value of `column` in `row`.
pub fn cell<'a>(header: &[String], row: &'a [String], column: &str) -> &'a str {
    let idx = header
        .iter()
        .position(|name| name == column)
        .unwrap_or_else(|| panic!("missing column {column}"));
    &row[idx]
}
