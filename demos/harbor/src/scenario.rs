//! A synthetic day in a six-pier harbour.

use std::io::Cursor;

use anyhow::Result;

use tug_core::GeoPoint;
use tug_model::{Task, Tug, load_tasks_reader, load_tugs_reader};
use tug_port::{PierMap, load_piers_reader};

/// Where tugs without a known pier are assumed to be.
pub const FALLBACK: GeoPoint = GeoPoint { lat: 22.58, lon: 120.30 };

const PIERS_CSV: &str = "\
pier_id,lat,lon\n\
0,22.615,120.265\n\
1,22.600,120.280\n\
2,22.585,120.292\n\
3,22.560,120.310\n\
4,22.545,120.322\n\
5,22.520,120.335\n\
";

// Tugs 21 and 22 belong to a neighbouring operator and only answer help
// requests.
const TUGS_CSV: &str = "\
tug_id,class,horsepower,company,shift,lat,lon,auxiliary\n\
1,117,1800,0,day,22.615,120.265,false\n\
2,117,1800,0,night,22.600,120.280,false\n\
3,118,2400,0,day,22.585,120.292,false\n\
4,118,2400,1,day,22.560,120.310,false\n\
5,119,3200,1,night,22.560,120.310,false\n\
6,119,3200,1,day,22.545,120.322,false\n\
7,120,3600,0,day,22.600,120.280,false\n\
8,120,3600,1,night,22.520,120.335,false\n\
9,130,6400,0,day,22.615,120.265,false\n\
10,130,6400,1,day,22.545,120.322,false\n\
21,118,2400,2,always,22.500,120.340,true\n\
22,130,6400,2,always,22.500,120.340,true\n\
";

const TASKS_CSV: &str = "\
task_id,ship_id,weight,tug_count,movement,origin,destination,start_min,wind_speed,required\n\
1,501,4200,1,in,0,2,360,3.0,\n\
2,502,12000,2,out,3,0,390,4.5,\n\
3,503,26000,2,in,1,4,420,6.0,\n\
4,504,8000,1,transfer,2,3,450,2.0,\n\
5,505,52000,2,in,0,5,480,8.5,\n\
6,506,3000,1,out,4,1,500,1.0,\n\
7,507,18000,1,in,5,2,540,3.5,\n\
8,508,72000,2,out,3,0,570,5.0,\n\
9,509,9500,1,transfer,1,2,600,2.5,\n\
10,510,41000,2,in,0,3,640,11.0,\n\
11,511,14000,2,out,2,5,690,4.0,\n\
12,512,105000,2,in,5,1,720,7.0,\n\
13,513,6000,1,in,4,0,780,2.0,\n\
14,514,33000,1,out,1,3,820,3.0,\n\
15,515,22000,2,transfer,3,4,870,5.5,\n\
16,516,4800,1,in,0,1,930,1.5,\n\
17,517,61000,2,out,5,2,990,9.0,\n\
18,518,11000,1,in,2,0,1050,3.0,\n\
19,519,27000,2,out,4,5,1140,6.5,\n\
20,520,15000,1,in,1,3,1260,2.0,119\n\
";

pub struct Scenario {
    pub piers: PierMap,
    pub own:   Vec<Tug>,
    pub help:  Vec<Tug>,
    pub tasks: Vec<Task>,
}

pub fn load() -> Result<Scenario> {
    let piers = load_piers_reader(Cursor::new(PIERS_CSV), FALLBACK)?;
    let (help, own): (Vec<Tug>, Vec<Tug>) =
        load_tugs_reader(Cursor::new(TUGS_CSV))?.into_iter().partition(|t| t.auxiliary);
    let tasks = load_tasks_reader(Cursor::new(TASKS_CSV))?;
    Ok(Scenario { piers, own, help, tasks })
}
