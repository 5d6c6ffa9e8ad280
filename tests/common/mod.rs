use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use car_inspector::services::reference_index::ReferenceIndex;
use car_inspector::services::textures::png_header;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Relative path → file bytes for one car folder.
#[derive(Clone)]
pub struct CarFiles {
    files: BTreeMap<String, Vec<u8>>,
}

impl CarFiles {
    /// A complete, rulebook-clean competition car.
    pub fn standard() -> Self {
        let mut files = BTreeMap::new();
        let mut put = |rel: &str, content: &[u8]| {
            files.insert(rel.to_string(), content.to_vec());
        };
        put(
            "data/car.ini",
            b"[HEADER]\nVERSION=2\n\n[INFO]\nSCREEN_NAME=EFVD Test Coupe\n\n\
              [BASIC]\nGRAPHICS_OFFSET=0.0, -0.10, 0.05\nTOTALMASS=1350\nINERTIA=1.8, 1.2, 4.1\n\n\
              [CONTROLS]\nSTEER_LOCK=540\nSTEER_RATIO=15\nLINEAR_STEER_ROD_RATIO=0.004\n\n\
              [FUELTANK]\nPOSITION=0, -0.1, -1.0\nFUEL=30\nMAX_FUEL=60\n",
        );
        put(
            "data/suspensions.ini",
            b"[HEADER]\nVERSION=4\n\n[BASIC]\nWHEELBASE=2.6\nCG_LOCATION=0.52\n\n\
              [FRONT]\nTYPE=DWB\nTRACK=1.52\nTOE_OUT=0.0005\n\n\
              [REAR]\nTYPE=DWB\nTRACK=1.54\n\n[GRAPHICS_OFFSETS]\nWHEEL_LF=0.0\n",
        );
        put(
            "data/engine.ini",
            b"[HEADER]\nVERSION=1\nPOWER_CURVE=power.lut\nLIMITER=7800\n\n[ENGINE_DATA]\nINERTIA=0.12\n",
        );
        put(
            "data/drivetrain.ini",
            b"[TRACTION]\nTYPE=RWD\n\n[GEARS]\nCOUNT=5\nGEAR_1=3.5\nGEAR_2=2.1\nGEAR_3=1.45\n\
              GEAR_4=1.1\nGEAR_5=0.9\nFINAL=3.9\n",
        );
        put(
            "data/tyres.ini",
            b"[HEADER]\nVERSION=10\n\n[FRONT]\nNAME=Street\nSHORT_NAME=ST\nWIDTH=0.245\nRADIUS=0.32\n\
              DX_REF=1.2\nDY_REF=1.18\n\n[REAR]\nWIDTH=0.265\nRADIUS=0.33\nDX_REF=1.25\nDY_REF=1.22\n",
        );
        put("data/brakes.ini", b"[DATA]\nMAX_TORQUE=1800\nFRONT_SHARE=0.68\n");
        put("data/aero.ini", b"[WING_0]\nNAME=BODY\nCL=0.1\nCD=0.3\n");
        put(
            "data/setup.ini",
            b"[TOE_OUT_LF]\nMIN=-0.1\nMAX=0.1\nSTEP=0.01\n\n[TOE_OUT_RF]\nMIN=-0.1\nMAX=0.1\nSTEP=0.01\n\n\
              [FUEL]\nMIN=5\nMAX=60\nSTEP=1\n",
        );
        put(
            "data/power.lut",
            b"1000|150\n2000|190\n3000|240\n4000|300\n5000|360\n6000|400\n7000|420\n",
        );
        put(
            "ui/ui_car.json",
            br#"{"name": "EFVD Test Coupe", "year": 1992, "tags": ["coupe", "rwd"], "powerCurve": [["1000", "150"], ["7000", "420"]]}"#,
        );
        put("efvd_test.kn5", b"kn5-body-mesh");
        put("collider.kn5", b"kn5-collider-mesh");
        put("skins/red/preview.png", &png_header(16, 16));
        Self { files }
    }

    #[allow(dead_code)]
    pub fn set(mut self, rel: &str, content: impl Into<Vec<u8>>) -> Self {
        self.files.insert(rel.to_string(), content.into());
        self
    }

    #[allow(dead_code)]
    pub fn remove(mut self, rel: &str) -> Self {
        self.files.remove(rel);
        self
    }

    /// Replaces `from` with `to` inside a text file; panics if absent.
    pub fn edit(mut self, rel: &str, from: &str, to: &str) -> Self {
        let raw = self.files.get(rel).expect("file present in fixture");
        let text = String::from_utf8(raw.clone()).expect("utf8 fixture");
        assert!(text.contains(from), "{rel} does not contain {from:?}");
        self.files.insert(rel.to_string(), text.replace(from, to).into_bytes());
        self
    }

    pub fn write_to(&self, dir: &Path) {
        for (rel, content) in &self.files {
            let path = dir.join(rel);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("create fixture dir");
            }
            fs::write(&path, content).expect("write fixture file");
        }
    }
}

/// Temp tree with `references/`, `submissions/` and an index location.
pub struct Workspace {
    _tmp: TempDir,
    pub root: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let root = tmp.path().to_path_buf();
        fs::create_dir_all(root.join("references")).expect("create references");
        fs::create_dir_all(root.join("submissions")).expect("create submissions");
        Self { _tmp: tmp, root }
    }

    pub fn references(&self) -> PathBuf {
        self.root.join("references")
    }

    pub fn submissions(&self) -> PathBuf {
        self.root.join("submissions")
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("index").join("reference_index.json")
    }

    pub fn add_reference(&self, key: &str, files: &CarFiles) -> PathBuf {
        let dir = self.references().join(key);
        files.write_to(&dir);
        dir
    }

    pub fn add_submission(&self, folder: &str, files: &CarFiles) -> PathBuf {
        let dir = self.submissions().join(folder);
        files.write_to(&dir);
        dir
    }

    /// Builds the index in-process and saves it to [`Self::index_path`].
    #[allow(dead_code)]
    pub fn build_index(&self) -> ReferenceIndex {
        let index = ReferenceIndex::build(&self.references()).expect("build index");
        index.save(&self.index_path()).expect("save index");
        index
    }

    #[allow(dead_code)]
    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("car-inspector");
        cmd.current_dir(&self.root).env_remove("RUST_LOG");
        cmd
    }

    #[allow(dead_code)]
    pub fn run_json(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }
}

#[allow(dead_code)]
pub fn path_str(p: &Path) -> &str {
    p.to_str().expect("utf8 path")
}
