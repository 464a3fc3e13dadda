flat_mod!(read, write);
