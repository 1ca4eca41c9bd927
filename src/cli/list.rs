use sjit::intrinsic::IntrinsicTable;
use sjit::kernels;

pub fn cmd_list() {
    for def in kernels::catalog() {
        println!("{:<16} {}", def.name, def.description);
    }
}

pub fn cmd_intrinsics() {
    let table = IntrinsicTable::standard();
    let mut protos: Vec<_> = table.iter().collect();
    protos.sort_by(|a, b| a.name.cmp(&b.name));
    for proto in protos {
        println!("{}", proto);
    }
    eprintln!("{} intrinsics", table.len());
}
